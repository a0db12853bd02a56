//! Moving completed downloads to remote storage.
//!
//! The [`Mover`] trait hides the transfer tool; [`RcloneMover`] shells out to
//! `rclone move`.

mod error;
mod rclone;
mod traits;
mod types;

pub use error::MoverError;
pub use rclone::RcloneMover;
pub use traits::Mover;
pub use types::{MoveReport, MoveRequest};
