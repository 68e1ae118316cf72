use crate::engine::Action;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What happened to one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionOutcome {
    /// Qualified name, e.g. `svc.(*Server).Get`.
    pub function: String,
    pub line: usize,
    #[serde(flatten)]
    pub action: Action,
}

/// A function that could not be processed. Other functions in the file are
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionError {
    pub function: String,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `ctxweave:skip` before the package clause.
    Directive,
    /// `// Code generated ... DO NOT EDIT.` header.
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    /// Changes are pending (dry run).
    Changed,
    Written,
    Skipped(SkipReason),
    Failed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Unchanged => write!(f, "unchanged"),
            FileStatus::Changed => write!(f, "would change"),
            FileStatus::Written => write!(f, "updated"),
            FileStatus::Skipped(SkipReason::Directive) => write!(f, "skipped (directive)"),
            FileStatus::Skipped(SkipReason::Generated) => write!(f, "skipped (generated)"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Original and rewritten text of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FunctionError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports_added: Vec<String>,
    /// File-level failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub change: Option<TextChange>,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            functions: Vec::new(),
            errors: Vec::new(),
            imports_added: Vec::new(),
            error: None,
            change: None,
        }
    }

    pub fn failed(path: impl Into<PathBuf>, error: impl fmt::Display) -> Self {
        let mut report = Self::new(path, FileStatus::Failed);
        report.error = Some(error.to_string());
        report
    }

    /// True when the file is fully processed: no file or function errors.
    pub fn is_clean(&self) -> bool {
        self.status != FileStatus::Failed && self.errors.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        matches!(self.status, FileStatus::Changed | FileStatus::Written)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub failed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub function_errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub summary: Summary,
}

impl RunReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        let mut summary = Summary {
            files: files.len(),
            ..Summary::default()
        };
        for file in &files {
            if file.is_changed() {
                summary.changed += 1;
            }
            if file.status == FileStatus::Failed {
                summary.failed += 1;
            }
            summary.function_errors += file.errors.len();
            for outcome in &file.functions {
                match outcome.action {
                    Action::Insert => summary.inserted += 1,
                    Action::Update { .. } => summary.updated += 1,
                    Action::Remove { .. } => summary.removed += 1,
                    Action::Skip => summary.unchanged += 1,
                }
            }
        }
        Self { files, summary }
    }

    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|file| !file.is_clean())
    }

    pub fn has_changes(&self) -> bool {
        self.summary.changed > 0
    }
}
