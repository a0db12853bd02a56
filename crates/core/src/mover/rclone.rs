//! rclone-based mover implementation.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::MoverConfig;

use super::error::MoverError;
use super::traits::Mover;
use super::types::{MoveReport, MoveRequest};

/// Maximum number of stderr bytes kept in a failure.
const MAX_STDERR_LEN: usize = 2000;

/// Mover that runs `rclone move`.
#[derive(Debug, Clone)]
pub struct RcloneMover {
    config: MoverConfig,
}

impl RcloneMover {
    pub fn new(config: MoverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MoverConfig::default())
    }

    /// Build the rclone argument list for a move.
    fn build_args(&self, request: &MoveRequest) -> Vec<String> {
        let mut args = vec![
            "move".to_string(),
            request.source_path.to_string_lossy().into_owned(),
            request.destination(),
            "--delete-empty-src-dirs".to_string(),
        ];

        if let Some(config_path) = &self.config.config_path {
            args.push("--config".to_string());
            args.push(config_path.to_string_lossy().into_owned());
        }

        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn map_spawn_error(&self, e: std::io::Error) -> MoverError {
        if e.kind() == std::io::ErrorKind::NotFound {
            MoverError::BinaryNotFound {
                path: self.config.rclone_path.clone(),
            }
        } else {
            MoverError::Io(e)
        }
    }
}

/// Keep the tail of stderr; rclone prints the actual error last.
fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_STDERR_LEN {
        return text.to_string();
    }
    let mut start = text.len() - MAX_STDERR_LEN;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[async_trait]
impl Mover for RcloneMover {
    fn name(&self) -> &str {
        "rclone"
    }

    async fn move_content(&self, request: MoveRequest) -> Result<MoveReport, MoverError> {
        if tokio::fs::metadata(&request.source_path).await.is_err() {
            return Err(MoverError::SourceMissing {
                path: request.source_path.clone(),
            });
        }

        let args = self.build_args(&request);
        let destination = request.destination();
        debug!(rclone = %self.config.rclone_path, ?args, "Starting rclone move");

        let started = Instant::now();
        let output = Command::new(&self.config.rclone_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        // Dropping the future on timeout kills the child
        let output = match timeout(request.timeout, output).await {
            Ok(result) => result.map_err(|e| self.map_spawn_error(e))?,
            Err(_) => {
                return Err(MoverError::Timeout {
                    timeout_secs: request.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(MoverError::CommandFailed {
                code: output.status.code(),
                stderr: truncate_stderr(&output.stderr),
            });
        }

        let duration = started.elapsed();
        info!(
            source = %request.source_path.display(),
            destination = %destination,
            duration_secs = duration.as_secs(),
            "rclone move finished"
        );

        Ok(MoveReport {
            destination,
            duration,
        })
    }

    async fn validate(&self) -> Result<(), MoverError> {
        let output = Command::new(&self.config.rclone_path)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(MoverError::CommandFailed {
                code: output.status.code(),
                stderr: truncate_stderr(&output.stderr),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MoveAction;
    use std::path::PathBuf;
    use std::time::Duration;

    fn request(source: impl Into<PathBuf>) -> MoveRequest {
        MoveRequest::new(
            source,
            &MoveAction::new("remote1:", "/movies/"),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_build_args_defaults() {
        let mover = RcloneMover::with_defaults();
        let args = mover.build_args(&request("/downloads/Movie"));
        assert_eq!(
            args,
            vec![
                "move",
                "/downloads/Movie",
                "remote1:/movies/",
                "--delete-empty-src-dirs"
            ]
        );
    }

    #[test]
    fn test_build_args_with_config_and_extras() {
        let mover = RcloneMover::new(MoverConfig {
            rclone_path: "/usr/bin/rclone".to_string(),
            config_path: Some(PathBuf::from("/etc/rclone.conf")),
            extra_args: vec!["--transfers=8".to_string()],
        });
        let args = mover.build_args(&request("/downloads/Movie"));
        assert_eq!(
            &args[4..],
            &["--config", "/etc/rclone.conf", "--transfers=8"]
        );
    }

    #[test]
    fn test_truncate_stderr_keeps_tail() {
        let long = format!("{}END", "x".repeat(5000));
        let truncated = truncate_stderr(long.as_bytes());
        assert!(truncated.starts_with("..."));
        assert!(truncated.ends_with("END"));
        assert_eq!(truncated.len(), MAX_STDERR_LEN + 3);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let mover = RcloneMover::with_defaults();
        let err = mover
            .move_content(request("/definitely/not/here/haul-test"))
            .await
            .unwrap_err();
        assert!(matches!(err, MoverError::SourceMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mover = RcloneMover::new(MoverConfig {
            rclone_path: "/nonexistent/rclone-haul-test".to_string(),
            ..Default::default()
        });

        let err = mover
            .move_content(request(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, MoverError::BinaryNotFound { .. }));
    }
}
