use std::env;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Keeps writes inside the workspace and away from vendored or cached Go code.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    workspace_root: PathBuf,
    /// Canonical module cache and toolchain directories.
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("path is inside a vendor directory: {0}")]
    Vendored(PathBuf),

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// The root is canonicalized so symlinked checkouts compare correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        let forbidden_paths = go_cache_dirs()
            .into_iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .collect();

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Resolve `path` against the root and check it may be written.
    ///
    /// Returns the canonical path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        let canonical = absolute.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        let relative = canonical.strip_prefix(&self.workspace_root).map_err(|_| {
            SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            }
        })?;

        // The module cache may live inside a workspace (GOPATH checkouts).
        if let Some(forbidden) = self
            .forbidden_paths
            .iter()
            .find(|forbidden| canonical.starts_with(forbidden))
        {
            return Err(SafetyError::ForbiddenPath {
                path: canonical.to_path_buf(),
                forbidden: forbidden.clone(),
            });
        }

        let vendored = relative
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == "vendor"));
        if vendored {
            return Err(SafetyError::Vendored(canonical.to_path_buf()));
        }

        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            workspace_root: workspace_root.as_ref().canonicalize()?,
            forbidden_paths: forbidden,
        })
    }
}

/// `$GOMODCACHE`, `$GOPATH/pkg/mod` (first entry), `~/go/pkg/mod`, `$GOROOT`.
fn go_cache_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(cache) = env::var_os("GOMODCACHE").filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(cache));
    }
    if let Some(gopath) = env::var_os("GOPATH") {
        if let Some(first) = env::split_paths(&gopath).next() {
            dirs.push(first.join("pkg").join("mod"));
        }
    }
    if let Some(home) = home::home_dir() {
        dirs.push(home.join("go").join("pkg").join("mod"));
    }
    if let Some(goroot) = env::var_os("GOROOT").filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(goroot));
    }
    dirs
}
