use crate::config::schema::{ValidationError, ValidationIssue, WeaveConfig};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up by [`discover`].
pub const CONFIG_FILE_NAME: &str = "ctxweave.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse weave config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse weave config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid weave config ({}): {}", path.display(), source),
                None => write!(f, "invalid weave config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse and validate a config. A `template_file` is resolved against the
/// current directory.
pub fn load_from_str(input: &str) -> Result<WeaveConfig, ConfigError> {
    load(input, Path::new("."))
}

/// Parse and validate a config file. A `template_file` is resolved against
/// the directory holding it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<WeaveConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or(Path::new("."));
    load(&contents, base).map_err(|error| error.with_path(path))
}

fn load(input: &str, base: &Path) -> Result<WeaveConfig, ConfigError> {
    let mut config: WeaveConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;

    if let Some(file) = config.template_file.clone() {
        if config.template.is_some() {
            return Err(ConfigError::Validation {
                path: None,
                source: ValidationError {
                    issues: vec![ValidationIssue::InvalidCombo {
                        message: "template and template_file cannot both be set".to_string(),
                    }],
                },
            });
        }
        let file = base.join(file);
        let text = fs::read_to_string(&file).map_err(|source| ConfigError::Io {
            path: file.clone(),
            source,
        })?;
        config.template = Some(text.trim_end_matches('\n').to_string());
        config.template_file = Some(file);
    }

    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

/// Nearest `ctxweave.toml` in `start` or one of its ancestors.
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
