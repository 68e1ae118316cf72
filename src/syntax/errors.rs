use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("failed to load the Go grammar")]
    LanguageSet,

    #[error("tree-sitter returned no tree")]
    ParseFailed,

    #[error("{line}:{column}: {found} ({count} error node(s))")]
    Invalid {
        line: usize,
        column: usize,
        found: String,
        count: usize,
    },

    #[error("missing package clause")]
    MissingPackage,

    #[error("statements escape the enclosing function body")]
    EscapedBody,
}
