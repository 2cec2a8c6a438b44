//! HTML parse / rewrite / serialize plumbing.
//!
//! # Responsibilities
//! - Build a document tree with a full HTML5 parser (html5ever), which
//!   always yields a tree, whatever the input looks like
//! - Run word decoration and link rewriting over the tree
//! - Serialize the mutated tree back to text
//!
//! # Design Decisions
//! - The tree is `Rc`-based and never leaves `MarkupRewriter::rewrite`, so it
//!   is never held across an `.await`
//! - Comments are their own node kind and are never visited as text
//! - Parsing runs with scripting disabled, so `<noscript>` content becomes
//!   real elements instead of one raw text node
//! - `<template>` contents are moved under the template element after
//!   parsing; the serializer only follows `children`
//! - Decoration and link rewriting touch disjoint node kinds; their order
//!   does not matter

use std::io;
use std::rc::Rc;

use html5ever::serialize::SerializeOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::config::RewriteConfig;
use crate::rewrite::links::LinkRewriter;
use crate::rewrite::words::WordDecorator;
use crate::rewrite::RewriteStats;
use crate::upstream::UrlRewriter;

/// Parse an HTML document. Malformed input still produces a tree.
pub fn parse(html: &str) -> RcDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom = parse_document(RcDom::default(), opts).one(html);
    adopt_template_contents(&dom.document);
    dom
}

/// Serialize a whole document back to HTML text.
pub fn serialize(dom: &RcDom) -> io::Result<String> {
    let mut out = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    let opts = SerializeOpts {
        scripting_enabled: false,
        ..Default::default()
    };
    html5ever::serialize(&mut out, &document, opts)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Visit every node below `root` together with its parent.
///
/// Iterative, so deeply nested documents cannot exhaust the stack.
pub(crate) fn walk(root: &Handle, mut visit: impl FnMut(&Handle, &Handle)) {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        let children = node.children.borrow();
        for child in children.iter() {
            visit(child, &node);
        }
        stack.extend(children.iter().rev().cloned());
    }
}

/// Move each `<template>` fragment's nodes under the template element.
fn adopt_template_contents(document: &Handle) {
    walk(document, |node, _| {
        let NodeData::Element {
            template_contents, ..
        } = &node.data
        else {
            return;
        };
        let Some(fragment) = template_contents.borrow_mut().take() else {
            return;
        };

        let adopted = std::mem::take(&mut *fragment.children.borrow_mut());
        for child in &adopted {
            child.parent.set(Some(Rc::downgrade(node)));
        }
        node.children.borrow_mut().extend(adopted);
    });
}

/// Output of one rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub html: String,
    pub stats: RewriteStats,
}

/// Runs the word decorator and link rewriter over HTML documents.
#[derive(Debug, Clone)]
pub struct MarkupRewriter {
    words: WordDecorator,
    links: LinkRewriter,
}

impl MarkupRewriter {
    pub fn new(config: &RewriteConfig, urls: UrlRewriter) -> Result<Self, regex::Error> {
        Ok(Self {
            words: WordDecorator::new(config)?,
            links: LinkRewriter::new(urls),
        })
    }

    /// Rewrite `html` for a caller reachable at `caller_base`.
    pub fn rewrite(&self, html: &str, caller_base: &str) -> io::Result<Rewritten> {
        let dom = parse(html);
        let (decorated_nodes, decorated_words) = self.words.apply(&dom.document);
        let rewritten_links = self.links.apply(&dom.document, caller_base);
        let html = serialize(&dom)?;

        Ok(Rewritten {
            html,
            stats: RewriteStats {
                decorated_nodes,
                decorated_words,
                rewritten_links,
            },
        })
    }
}
