//! Comment directives that exempt files, functions and statements from weaving.

use crate::syntax::{Comment, Node};

/// Marker that exempts a file, function or statement from weaving.
pub const DIRECTIVE_MARKER: &str = "ctxweave:skip";

/// Marker written onto generated statements when marking is enabled.
pub const GENERATED_MARKER: &str = "ctxweave:generated";

/// Comment text without `//` or `/* */` delimiters and surrounding whitespace.
pub fn comment_body(text: &str) -> &str {
    let text = text.trim();
    if let Some(line) = text.strip_prefix("//") {
        return line.trim();
    }
    if let Some(block) = text.strip_prefix("/*") {
        return block.strip_suffix("*/").unwrap_or(block).trim();
    }
    text
}

/// True when any comment starts with `marker` once its delimiters are gone.
/// Free text may follow the marker.
pub fn has_marker<'a>(comments: impl IntoIterator<Item = &'a Comment>, marker: &str) -> bool {
    comments
        .into_iter()
        .any(|comment| comment_body(&comment.text).starts_with(marker))
}

/// Statement scope: leading and trailing comments both count.
pub fn node_has_marker(node: &Node, marker: &str) -> bool {
    has_marker(node.trivia.comments(), marker)
}
