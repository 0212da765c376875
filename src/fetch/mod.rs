//! Throttled fetch module
//!
//! This module contains everything that talks to the target site:
//! - Global pacing shared by every clone of the client
//! - robots.txt enforcement
//! - Retry with exponential backoff

mod client;
mod pacer;

pub use client::{build_http_client, RawDocument, ThrottledClient};
pub use pacer::{PaceSlot, Pacer};
