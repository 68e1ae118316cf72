use crate::pool::with_parser;
use crate::syntax::errors::SyntaxError;

/// Validate that Go source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR or MISSING nodes.
pub fn validate_syntax(source: &str) -> Result<(), SyntaxError> {
    with_parser(|parser| parser.parse_with_source(source)?.check())?
}
