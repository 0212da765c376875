//! Durable, resumable job state
//!
//! A [`CheckpointSession`] partitions a run's targets into pending, processed
//! and failed. The [`CheckpointStore`] owns the session, auto-saves it every
//! few marks, and writes snapshots atomically so a crash mid-write never
//! destroys the previous one.
//!
//! Snapshot format (version 1):
//!
//! ```json
//! {
//!   "version": 1,
//!   "sessionId": "...",
//!   "startedAt": "2024-01-01T00:00:00Z",
//!   "lastUpdated": "2024-01-01T00:05:00Z",
//!   "totalCount": 3,
//!   "pendingIds": ["..."],
//!   "processedIds": ["..."],
//!   "failedIds": [],
//!   "successCount": 1,
//!   "failureCount": 0,
//!   "metadata": {}
//! }
//! ```

mod session;
mod store;

pub use session::{CheckpointSession, CHECKPOINT_VERSION};
pub use store::{read_snapshot, CheckpointStore};
