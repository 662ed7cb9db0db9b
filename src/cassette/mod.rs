//! Cassette format for recording and replaying assistant sessions.
//!
//! A cassette captures every assistant invocation of a CLI run so the same
//! workflow can be replayed later without a live assistant.

pub mod format;
pub mod recorder;
pub mod replayer;
