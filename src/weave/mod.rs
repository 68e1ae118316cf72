//! File driver: runs the engine over every eligible function of a Go file.
//!
//! Per file: parse, check the file directive, then for each function with a
//! body check the declaration directive, match the first parameter against
//! the carriers, render the template, detect, mutate and print the body back
//! as a splice. Missing imports are added once anything was inserted or
//! updated. The rewritten file must parse before it is written.
//!
//! A failure in one function is recorded against that function; the rest of
//! the file is still processed.

pub mod carrier;
pub mod imports;
pub mod report;
pub mod template;

use crate::config::{ValidationError, WeaveConfig};
use crate::edit::{self, apply_splices, content_hash, EditError, Splice};
use crate::engine::{
    apply, detect, has_marker, Action, Candidate, DetectOptions, EngineError, DIRECTIVE_MARKER,
    GENERATED_MARKER,
};
use crate::pool::with_parser;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::syntax::{
    parse_statements, print_block, FuncDecl, GoFile, GoParser, ImportMap, ImportSpec, Receiver,
    SyntaxError,
};
use carrier::{match_carrier, Carrier};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use template::{Template, TemplateError, Vars};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use report::{
    FileReport, FileStatus, FunctionError, FunctionOutcome, RunReport, SkipReason, Summary,
    TextChange,
};

#[derive(Debug)]
pub enum WeaveError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The input does not parse.
    Syntax(SyntaxError),
    Edit(EditError),
    /// The rewritten file does not parse.
    InvalidOutput(SyntaxError),
    Safety(SafetyError),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl fmt::Display for WeaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaveError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            WeaveError::Syntax(e) => write!(f, "cannot parse input: {e}"),
            WeaveError::Edit(e) => write!(f, "edit error: {e}"),
            WeaveError::InvalidOutput(e) => {
                write!(f, "rewritten file does not parse, left untouched: {e}")
            }
            WeaveError::Safety(e) => write!(f, "{e}"),
            WeaveError::ThreadPool(e) => write!(f, "cannot start worker pool: {e}"),
        }
    }
}

impl std::error::Error for WeaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WeaveError::Io { source, .. } => Some(source),
            WeaveError::Syntax(e) | WeaveError::InvalidOutput(e) => Some(e),
            WeaveError::Edit(e) => Some(e),
            WeaveError::Safety(e) => Some(e),
            WeaveError::ThreadPool(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for WeaveError {
    fn from(e: SyntaxError) -> Self {
        WeaveError::Syntax(e)
    }
}

impl From<EditError> for WeaveError {
    fn from(e: EditError) -> Self {
        WeaveError::Edit(e)
    }
}

impl From<SafetyError> for WeaveError {
    fn from(e: SafetyError) -> Self {
        WeaveError::Safety(e)
    }
}

/// Result of weaving one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    /// Rewritten source; `None` when nothing changed.
    pub output: Option<String>,
    pub functions: Vec<FunctionOutcome>,
    pub errors: Vec<FunctionError>,
    pub imports_added: Vec<String>,
    /// The file carries a `ctxweave:skip` directive.
    pub skipped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Worker threads; `None` uses rayon's default.
    pub jobs: Option<usize>,
    /// Refuse files outside this root (and vendored or module-cache files).
    pub workspace_root: Option<PathBuf>,
}

/// Template variables describing one function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext<'a> {
    pub package: &'a str,
    pub name: &'a str,
    pub receiver: Option<&'a Receiver>,
    pub generic: bool,
    /// Name of the carrier parameter.
    pub var: &'a str,
}

impl<'a> FunctionContext<'a> {
    fn of(package: &'a str, func: &'a FuncDecl, var: &'a str) -> Self {
        Self {
            package,
            name: &func.name,
            receiver: func.receiver.as_ref(),
            generic: func.has_type_params || func.receiver.as_ref().is_some_and(|r| r.generic),
            var,
        }
    }

    /// `pkg.Func`, `pkg.(*T).Method` or `pkg.T.Method`.
    pub fn qualified_name(&self) -> String {
        match self.receiver {
            Some(recv) if recv.pointer => {
                format!("{}.(*{}).{}", self.package, recv.type_name, self.name)
            }
            Some(recv) => format!("{}.{}.{}", self.package, recv.type_name, self.name),
            None => format!("{}.{}", self.package, self.name),
        }
    }

    fn vars(&self, ctx: String) -> Vars {
        let mut vars = Vars::new();
        vars.insert("Ctx", ctx.into());
        vars.insert("CtxVar", self.var.into());
        vars.insert("FuncName", self.qualified_name().into());
        vars.insert("FuncBaseName", self.name.into());
        vars.insert("PackageName", self.package.into());
        vars.insert(
            "ReceiverType",
            self.receiver.map_or("", |r| r.type_name.as_str()).into(),
        );
        vars.insert(
            "ReceiverVar",
            self.receiver
                .and_then(|r| r.var.as_deref())
                .filter(|v| *v != "_")
                .unwrap_or("")
                .into(),
        );
        vars.insert("IsMethod", self.receiver.is_some().into());
        vars.insert(
            "IsPointerReceiver",
            self.receiver.is_some_and(|r| r.pointer).into(),
        );
        vars.insert("IsGeneric", self.generic.into());
        vars
    }
}

#[derive(Debug, Clone)]
pub struct Weaver {
    template: Template,
    carriers: Vec<Carrier>,
    imports: Vec<String>,
    remove: bool,
    mark_generated: bool,
    include_tests: bool,
    exclude_dirs: Vec<String>,
}

enum FunctionStep {
    Done(Action, Option<Splice>),
    Ignored,
}

impl Weaver {
    /// Build a weaver from a loaded configuration.
    pub fn from_config(config: &WeaveConfig) -> Result<Self, ValidationError> {
        let compiled = config.compile()?;
        Ok(Self {
            template: compiled.template,
            carriers: compiled.carriers,
            imports: config.imports.clone(),
            remove: config.remove,
            mark_generated: config.mark_generated,
            include_tests: config.include_tests,
            exclude_dirs: config.exclude_dirs.clone(),
        })
    }

    /// Switch to remove mode regardless of the configuration.
    pub fn with_remove(mut self, remove: bool) -> Self {
        self.remove = self.remove || remove;
        self
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    /// Render the template for one function, using `carrier` for `Ctx`.
    pub fn render(
        &self,
        carrier: &Carrier,
        function: &FunctionContext<'_>,
    ) -> Result<String, TemplateError> {
        let ctx = carrier.context_expr(function.var)?;
        self.template.render(&function.vars(ctx))
    }

    /// Weave one source text in memory.
    pub fn weave_source(&self, source: &str) -> Result<FileOutcome, WeaveError> {
        with_parser(|parser| self.weave_with(parser, source))?
    }

    fn weave_with(&self, parser: &mut GoParser, source: &str) -> Result<FileOutcome, WeaveError> {
        let file = GoFile::parse(parser, source)?;
        let mut outcome = FileOutcome::default();

        if has_marker(&file.leading_comments, DIRECTIVE_MARKER) {
            debug!(package = %file.package, "file carries skip directive");
            outcome.skipped = true;
            return Ok(outcome);
        }

        let imports = self.candidate_imports(&file);
        let mut splices = Vec::new();
        let mut needs_imports = false;

        for func in &file.functions {
            let Some((carrier, var)) = match_carrier(&self.carriers, func.first_param.as_ref())
            else {
                continue;
            };
            let function = FunctionContext::of(&file.package, func, var);
            let name = function.qualified_name();

            match self.weave_function(parser, source, func, carrier, &function, &imports) {
                Ok(FunctionStep::Ignored) => {}
                Ok(FunctionStep::Done(action, splice)) => {
                    debug!(function = %name, ?action, "detected");
                    needs_imports |= matches!(action, Action::Insert | Action::Update { .. });
                    splices.extend(splice);
                    outcome.functions.push(FunctionOutcome {
                        function: name,
                        line: func.line,
                        action,
                    });
                }
                Err(message) => {
                    warn!(function = %name, line = func.line, error = %message, "function skipped");
                    outcome.errors.push(FunctionError {
                        function: name,
                        line: func.line,
                        message,
                    });
                }
            }
        }

        if needs_imports {
            let missing = imports::missing_imports(&file, &self.imports);
            if let Some(splice) = imports::import_splice(source, file.import_anchor, &missing) {
                splices.push(splice);
                outcome.imports_added = missing.iter().map(|p| p.to_string()).collect();
            }
        }

        if splices.is_empty() {
            return Ok(outcome);
        }
        let output = apply_splices(source, splices)?;
        parser
            .parse_with_source(&output)?
            .check()
            .map_err(WeaveError::InvalidOutput)?;
        if output != source {
            outcome.output = Some(output);
        }
        Ok(outcome)
    }

    /// Returns a message for errors that only affect this function.
    fn weave_function(
        &self,
        parser: &mut GoParser,
        source: &str,
        func: &FuncDecl,
        carrier: &Carrier,
        function: &FunctionContext<'_>,
        imports: &ImportMap,
    ) -> Result<FunctionStep, String> {
        let Some(body) = &func.body else {
            return Ok(FunctionStep::Ignored);
        };
        if has_marker(&func.doc, DIRECTIVE_MARKER) {
            return Ok(FunctionStep::Done(Action::Skip, None));
        }

        let text = self.render(carrier, function).map_err(|e| e.to_string())?;
        let nodes = parse_statements(parser, &text, imports).map_err(|e| {
            EngineError::CandidateParse {
                message: e.to_string(),
            }
            .to_string()
        })?;
        let candidate = Candidate::new(nodes).map_err(|e| e.to_string())?;

        let marker = self.mark_generated.then_some(GENERATED_MARKER);
        let options = DetectOptions {
            remove: self.remove,
            generated_marker: marker,
        };
        let action = detect(&body.block.stmts, &candidate, &options);
        if action.is_skip() {
            return Ok(FunctionStep::Done(action, None));
        }

        let mut block = body.block.clone();
        if let Err(e) = apply(&mut block, action, &candidate, marker) {
            debug_assert!(false, "detected action out of bounds: {e}");
            return Err(e.to_string());
        }

        let printed = print_block(&block, &body.indent, &body.closing_indent);
        let before = &source[body.inner_start..body.inner_end];
        let splice =
            (printed != before).then(|| Splice::new(body.inner_start, body.inner_end, printed, before));
        Ok(FunctionStep::Done(action, splice))
    }

    /// File imports plus configured ones, so configured packages resolve in
    /// the candidate even before the import is added.
    fn candidate_imports(&self, file: &GoFile) -> ImportMap {
        let mut specs = file.imports.specs().to_vec();
        for path in &self.imports {
            if !file.imports.contains_path(path) {
                specs.push(ImportSpec {
                    alias: None,
                    path: path.clone(),
                });
            }
        }
        ImportMap::new(specs)
    }

    /// Weave a file on disk; writes unless `dry_run`.
    pub fn weave_file(&self, path: &Path, dry_run: bool) -> FileReport {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(source) => {
                return FileReport::failed(
                    path,
                    WeaveError::Io {
                        path: path.to_path_buf(),
                        source,
                    },
                )
            }
        };
        if is_generated(&source) {
            debug!(path = %path.display(), "generated file");
            return FileReport::new(path, FileStatus::Skipped(SkipReason::Generated));
        }

        let read_hash = content_hash(&source);
        let outcome = match self.weave_source(&source) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file skipped");
                return FileReport::failed(path, e);
            }
        };

        let status = match (&outcome.output, outcome.skipped) {
            (_, true) => FileStatus::Skipped(SkipReason::Directive),
            (None, false) => FileStatus::Unchanged,
            (Some(_), false) if dry_run => FileStatus::Changed,
            (Some(output), false) => match edit::write_if_unchanged(path, read_hash, output) {
                Ok(()) => {
                    info!(path = %path.display(), "updated");
                    FileStatus::Written
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "write failed");
                    let mut report = FileReport::failed(path, WeaveError::Edit(e));
                    report.functions = outcome.functions;
                    report.errors = outcome.errors;
                    return report;
                }
            },
        };

        let mut report = FileReport::new(path, status);
        report.change = outcome.output.map(|after| TextChange {
            before: source,
            after,
        });
        report.functions = outcome.functions;
        report.errors = outcome.errors;
        report.imports_added = outcome.imports_added;
        report
    }

    /// Go files under `paths`. Explicit file arguments are taken as given.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in paths {
            if root.is_file() {
                files.push(root.clone());
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded_dir(entry));
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "cannot walk directory entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() && self.is_candidate_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }
        files.sort();
        files.dedup();
        files
    }

    fn is_excluded_dir(&self, entry: &walkdir::DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.exclude_dirs.iter().any(|dir| *dir == name)
    }

    fn is_candidate_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.ends_with(".go") && (self.include_tests || !name.ends_with("_test.go"))
    }

    /// Discover and weave every file under `paths`, in parallel.
    pub fn run(&self, paths: &[PathBuf], options: &RunOptions) -> Result<RunReport, WeaveError> {
        let guard = options
            .workspace_root
            .as_ref()
            .map(WorkspaceGuard::new)
            .transpose()?;
        let files = self.discover(paths);
        info!(files = files.len(), dry_run = options.dry_run, "weaving");

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = options.jobs {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build().map_err(WeaveError::ThreadPool)?;

        let reports: Vec<FileReport> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if let Some(guard) = &guard {
                        if let Err(e) = guard.validate_path(path) {
                            return FileReport::failed(path, e);
                        }
                    }
                    self.weave_file(path, options.dry_run)
                })
                .collect()
        });
        Ok(RunReport::new(reports))
    }
}

/// Go's generated-file convention: a `// Code generated ... DO NOT EDIT.`
/// line before the first non-comment text.
pub fn is_generated(source: &str) -> bool {
    for line in source.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix("//") else {
            return false;
        };
        let comment = comment.trim_start();
        if comment.starts_with("Code generated ") && comment.ends_with(" DO NOT EDIT.") {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names() {
        let recv = Receiver {
            var: Some("s".into()),
            type_name: "Server".into(),
            pointer: true,
            generic: false,
        };
        let mut function = FunctionContext {
            package: "svc",
            name: "Get",
            receiver: Some(&recv),
            generic: false,
            var: "ctx",
        };
        assert_eq!(function.qualified_name(), "svc.(*Server).Get");

        let value = Receiver {
            pointer: false,
            ..recv.clone()
        };
        function.receiver = Some(&value);
        assert_eq!(function.qualified_name(), "svc.Server.Get");

        function.receiver = None;
        assert_eq!(function.qualified_name(), "svc.Get");
    }

    #[test]
    fn generated_header_detection() {
        assert!(is_generated(
            "// Code generated by protoc-gen-go. DO NOT EDIT.\n\npackage pb\n"
        ));
        assert!(is_generated(
            "// Copyright 2024\n\n// Code generated by mockgen. DO NOT EDIT.\npackage m\n"
        ));
        assert!(!is_generated("package a\n\n// Code generated x. DO NOT EDIT.\n"));
        assert!(!is_generated("// Code generated, edit freely\npackage a\n"));
    }
}
