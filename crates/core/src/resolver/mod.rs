//! Identity resolution for submitted downloads.
//!
//! The backing service accepts an add request without telling us which item
//! it created. This module classifies the source locator, tags the request and
//! then polls a fixed chain of matchers until the item shows up:
//!
//! 1. [`Matcher::TagFilter`] asks for items carrying the correlation tag
//! 2. [`Matcher::DirectLookup`] fetches the info hash read off a magnet URI
//! 3. [`Matcher::RecentWindow`] scans the newest items (see [`select_from_window`])

mod identity;
mod locator;
mod matcher;
mod types;

pub use identity::IdentityResolver;
pub use matcher::{select_from_window, MatchOutcome, Matcher};
pub use types::*;
