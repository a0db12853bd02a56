//! HTTP host for the haul download pipeline.

pub mod api;
pub mod metrics;
pub mod state;
