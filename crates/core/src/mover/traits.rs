//! Trait definitions for the mover module.

use async_trait::async_trait;

use super::error::MoverError;
use super::types::{MoveReport, MoveRequest};

/// Moves completed content off the download host.
#[async_trait]
pub trait Mover: Send + Sync {
    /// Returns the name of this mover implementation.
    fn name(&self) -> &str;

    /// Moves the source to its destination, removing the local copy.
    async fn move_content(&self, request: MoveRequest) -> Result<MoveReport, MoverError>;

    /// Validates that the mover is properly configured and ready.
    async fn validate(&self) -> Result<(), MoverError>;
}
