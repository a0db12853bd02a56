//! Download pipeline: submission, completion monitoring and move execution.
//!
//! - **Submit**: resolve the download id, then register its move action
//! - **Monitor**: one scan per interval tick, items handled sequentially
//! - **Execute**: move, remove the source, release, notify

mod executor;
mod monitor;
mod runner;
mod types;

pub use executor::ActionExecutor;
pub use monitor::CompletionMonitor;
pub use runner::DownloadPipeline;
pub use types::*;
