//! Matching and mutation engine.
//!
//! Given a block and a candidate, [`detect`] decides between skip, insert,
//! update and remove, and [`mutate::apply`] carries the decision out. The
//! pair is idempotent: applying the detected action and detecting again
//! always yields [`Action::Skip`].

pub mod compare;
pub mod detect;
pub mod directive;
pub mod errors;
pub mod mutate;

pub use compare::{compare, compare_list, MatchMode};
pub use detect::{detect, find_window, Action, Candidate, DetectOptions};
pub use directive::{comment_body, has_marker, node_has_marker, DIRECTIVE_MARKER, GENERATED_MARKER};
pub use errors::EngineError;
pub use mutate::{apply, insert_front, remove_range, replace_range};
