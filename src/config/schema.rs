use crate::weave::carrier::{Carrier, CarrierError};
use crate::weave::template::{Template, TemplateError, FUNC_VARS};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WeaveConfig {
    /// Statement template, inline.
    #[serde(default)]
    pub template: Option<String>,
    /// Statement template read from a file, relative to the config file.
    #[serde(default)]
    pub template_file: Option<PathBuf>,
    /// Import paths the rendered statements need.
    #[serde(default)]
    pub imports: Vec<String>,
    /// First-parameter types that select a function. Defaults to `context.Context`.
    #[serde(default)]
    pub carriers: Vec<CarrierConfig>,
    #[serde(default)]
    pub remove: bool,
    /// Tag woven statements with a `//ctxweave:generated` comment.
    #[serde(default)]
    pub mark_generated: bool,
    #[serde(default)]
    pub include_tests: bool,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub hooks: Hooks,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            template: None,
            template_file: None,
            imports: Vec::new(),
            carriers: Vec::new(),
            remove: false,
            mark_generated: false,
            include_tests: false,
            exclude_dirs: default_exclude_dirs(),
            hooks: Hooks::default(),
        }
    }
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["vendor".to_string(), "testdata".to_string()]
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CarrierConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Template producing the context from the parameter, e.g. `{{.Var}}.Context()`.
    #[serde(default)]
    pub accessor: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Hooks {
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

/// The parts of a configuration the weaver runs on.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub template: Template,
    pub carriers: Vec<Carrier>,
}

impl WeaveConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.compile().map(|_| ())
    }

    /// Parse the template and carriers, collecting every problem found.
    ///
    /// `template_file` must already have been read into `template`.
    pub fn compile(&self) -> Result<Compiled, ValidationError> {
        let mut issues = Vec::new();

        let template = match self.template.as_deref() {
            None => {
                issues.push(ValidationIssue::MissingField { field: "template" });
                None
            }
            Some(text) if text.trim().is_empty() => {
                issues.push(ValidationIssue::MissingField { field: "template" });
                None
            }
            Some(text) => match Template::parse(text, FUNC_VARS) {
                Ok(template) => Some(template),
                Err(source) => {
                    issues.push(ValidationIssue::Template(source));
                    None
                }
            },
        };

        let mut carriers = Vec::new();
        if self.carriers.is_empty() {
            carriers.push(Carrier::context());
        }
        for carrier in &self.carriers {
            match Carrier::new(&carrier.type_name, carrier.accessor.as_deref()) {
                Ok(carrier) => carriers.push(carrier),
                Err(source) => issues.push(ValidationIssue::Carrier(source)),
            }
        }

        for import in &self.imports {
            let path = import.trim();
            if path.is_empty() || path.contains(|c: char| c == '"' || c.is_whitespace()) {
                issues.push(ValidationIssue::InvalidImport(import.clone()));
            }
        }

        for dir in &self.exclude_dirs {
            if dir.is_empty() || dir.contains('/') {
                issues.push(ValidationIssue::InvalidCombo {
                    message: format!("exclude_dirs entry '{dir}' must be a single directory name"),
                });
            }
        }

        for command in self.hooks.pre.iter().chain(&self.hooks.post) {
            if command.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "hooks command",
                });
            }
        }

        match template {
            Some(template) if issues.is_empty() => Ok(Compiled {
                template,
                carriers,
            }),
            _ => Err(ValidationError { issues }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    InvalidCombo { message: String },
    Template(TemplateError),
    Carrier(CarrierError),
    InvalidImport(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid configuration: {message}")
            }
            ValidationIssue::Template(e) => write!(f, "template: {e}"),
            ValidationIssue::Carrier(e) => write!(f, "{e}"),
            ValidationIssue::InvalidImport(path) => {
                write!(f, "import '{path}' is not a valid import path")
            }
        }
    }
}
