//! Thread-local parser pooling.
//!
//! Every rayon worker processes whole files, so each thread keeps one Go
//! parser and reuses it for the file, its candidates, and the output check.

use crate::syntax::{GoParser, SyntaxError};
use std::cell::RefCell;

thread_local! {
    static GO_PARSER: RefCell<Option<GoParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance. Calls must not nest on the same thread.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use ctxweave::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source("package main").map(|p| p.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, SyntaxError>
where
    F: FnOnce(&mut GoParser) -> R,
{
    GO_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.take() {
            Some(parser) => parser,
            None => GoParser::new()?,
        };
        Ok(f(slot.insert(parser)))
    })
}
