//! Shell commands run around a weave.

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum HookError {
    #[error("failed to start hook `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hook `{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Run each command with `sh -c` in `dir`, stopping at the first failure.
pub fn run_hooks(commands: &[String], dir: &Path, stage: &str) -> Result<(), HookError> {
    for command in commands {
        info!(stage, command = %command, "running hook");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .output()
            .map_err(|source| HookError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HookError::Failed {
                command: command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(
            stage,
            command = %command,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "hook finished"
        );
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn runs_in_directory_and_stops_on_failure() {
        let temp = TempDir::new().unwrap();
        let commands = vec![
            "touch first".to_string(),
            "echo nope >&2; exit 3".to_string(),
            "touch never".to_string(),
        ];

        let err = run_hooks(&commands, temp.path(), "pre").unwrap_err();
        match err {
            HookError::Failed { command, stderr, .. } => {
                assert!(command.contains("exit 3"));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(temp.path().join("first").exists());
        assert!(!temp.path().join("never").exists());
    }
}
