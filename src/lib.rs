//! ctxweave: keep boilerplate statements at the top of Go functions that
//! take a context.
//!
//! Functions whose first parameter is a configured carrier type (by default
//! `context.Context`) get a statement sequence rendered from a template,
//! typically `defer trace.Start(ctx, "pkg.Func").End()`. Running again is a
//! no-op: equivalent statements are detected, stale ones updated in place,
//! and nothing is duplicated.
//!
//! # Architecture
//!
//! - [`syntax`]: tree-sitter Go parsing, lowered into a closed node model
//!   with explicit comment trivia, and printing of rewritten blocks.
//! - [`engine`]: structural comparison, window detection and block mutation.
//! - [`weave`]: the per-file driver, templates, carriers and imports.
//! - [`edit`]: byte-span splices and atomic, conflict-checked writes.
//!
//! Only rewritten function bodies and the import block are touched; the
//! rest of a file is never reformatted.
//!
//! # Example
//!
//! ```no_run
//! use ctxweave::config::load_from_str;
//! use ctxweave::weave::Weaver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_from_str(
//!     r#"
//! template = 'defer trace.Start({{.Ctx}}, "{{.FuncName}}").End()'
//! imports = ["example.com/trace"]
//! "#,
//! )?;
//! let weaver = Weaver::from_config(&config)?;
//! let outcome = weaver.weave_source("package svc\n\nimport \"context\"\n\nfunc Get(ctx context.Context) {}\n")?;
//! println!("{}", outcome.output.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod edit;
pub mod engine;
pub mod hooks;
pub mod pool;
pub mod safety;
pub mod syntax;
pub mod weave;

pub use config::{load_from_path, load_from_str, ConfigError, WeaveConfig};
pub use edit::{EditError, Splice, Verification};
pub use engine::{Action, Candidate, EngineError, MatchMode};
pub use safety::{SafetyError, WorkspaceGuard};
pub use weave::{FileOutcome, FileReport, RunOptions, RunReport, WeaveError, Weaver};
