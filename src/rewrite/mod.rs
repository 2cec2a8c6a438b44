//! HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! decoded HTML text
//!     → markup.rs (html5ever parse into an RcDom tree)
//!     → words.rs (™ after qualifying words in visible text nodes)
//!     → links.rs (upstream-base links → caller base)
//!     → markup.rs (serialize)
//! ```

pub mod links;
pub mod markup;
pub mod words;

pub use links::LinkRewriter;
pub use markup::{MarkupRewriter, Rewritten};
pub use words::WordDecorator;

/// What one rewrite changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub decorated_nodes: usize,
    pub decorated_words: usize,
    pub rewritten_links: usize,
}
