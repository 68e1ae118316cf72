//! Go front end: tree-sitter parsing, lowering into the node model, and
//! printing mutated blocks back to text.
//!
//! The engine never sees tree-sitter types. Everything it compares or moves
//! is a [`Node`] with explicit [`Trivia`], so comments survive edits to the
//! statements around them.

pub mod errors;
pub mod file;
pub mod lower;
pub mod node;
pub mod parser;
pub mod print;
pub mod validator;

pub use errors::SyntaxError;
pub use file::{parse_statements, FuncBody, FuncDecl, GoFile, ImportAnchor, Param, Receiver};
pub use lower::{default_package_name, ImportMap, ImportSpec};
pub use node::{
    Block, Comment, Ident, Literal, LiteralKind, Node, NodeKind, Signature, Trivia,
};
pub use parser::{GoParser, ParsedSource};
pub use print::print_block;
pub use validator::validate_syntax;
