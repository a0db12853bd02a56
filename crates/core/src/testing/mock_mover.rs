//! Mock mover for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::mover::{MoveReport, MoveRequest, Mover, MoverError};

/// Mock implementation of the Mover trait.
///
/// Records every request and succeeds unless told otherwise.
///
/// # Example
///
/// ```rust,ignore
/// let mover = MockMover::new();
/// mover.fail_next("rclone exited with code 1").await;
/// ```
#[derive(Debug, Default)]
pub struct MockMover {
    /// Recorded move requests.
    moves: Arc<RwLock<Vec<MoveRequest>>>,
    /// If set, the next move fails with this stderr.
    next_failure: Arc<RwLock<Option<String>>>,
    /// Simulated move duration.
    delay: Arc<RwLock<Duration>>,
}

impl MockMover {
    /// Create a new mock mover.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded move requests.
    pub async fn recorded_moves(&self) -> Vec<MoveRequest> {
        self.moves.read().await.clone()
    }

    /// Make the next move fail as if the command exited with code 1.
    pub async fn fail_next(&self, stderr: impl Into<String>) {
        *self.next_failure.write().await = Some(stderr.into());
    }

    /// Make every move take this long.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Mover for MockMover {
    fn name(&self) -> &str {
        "mock"
    }

    async fn move_content(&self, request: MoveRequest) -> Result<MoveReport, MoverError> {
        self.moves.write().await.push(request.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            if delay > request.timeout {
                tokio::time::sleep(request.timeout).await;
                return Err(MoverError::Timeout {
                    timeout_secs: request.timeout.as_secs(),
                });
            }
            tokio::time::sleep(delay).await;
        }

        if let Some(stderr) = self.next_failure.write().await.take() {
            return Err(MoverError::CommandFailed {
                code: Some(1),
                stderr,
            });
        }

        Ok(MoveReport {
            destination: request.destination(),
            duration: delay,
        })
    }

    async fn validate(&self) -> Result<(), MoverError> {
        Ok(())
    }
}
