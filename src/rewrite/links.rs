//! Link host rewriting.
//!
//! Anchors (`a[href]`) and SVG sprite references (`use[xlink:href]`) that
//! point at the upstream base are redirected to the caller's own base so
//! that navigation stays inside the proxy.

use markup5ever_rcdom::{Handle, NodeData};

use crate::rewrite::markup::walk;
use crate::upstream::UrlRewriter;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

#[derive(Debug, Clone)]
pub struct LinkRewriter {
    urls: UrlRewriter,
}

impl LinkRewriter {
    pub fn new(urls: UrlRewriter) -> Self {
        Self { urls }
    }

    /// Rewrite matching link attributes in place. Returns how many changed.
    pub fn apply(&self, document: &Handle, caller_base: &str) -> usize {
        let mut rewritten = 0;
        walk(document, |node, _| {
            let NodeData::Element { name, attrs, .. } = &node.data else {
                return;
            };
            let is_link_attr: fn(&html5ever::Attribute) -> bool = match &*name.local {
                "a" => is_href,
                "use" => is_xlink_href,
                _ => return,
            };

            for attr in attrs.borrow_mut().iter_mut().filter(|a| is_link_attr(a)) {
                let target = self.urls.to_caller(&attr.value, caller_base).into_owned();
                if *target != *attr.value {
                    attr.value = target.as_str().into();
                    rewritten += 1;
                }
            }
        });
        rewritten
    }
}

fn is_href(attr: &html5ever::Attribute) -> bool {
    attr.name.ns.is_empty() && &*attr.name.local == "href"
}

/// `xlink:href` is namespaced inside `<svg>`, but a stray `<use>` outside
/// foreign content keeps the literal attribute name.
fn is_xlink_href(attr: &html5ever::Attribute) -> bool {
    (&*attr.name.ns == XLINK_NS && &*attr.name.local == "href")
        || (attr.name.ns.is_empty() && &*attr.name.local == "xlink:href")
}
