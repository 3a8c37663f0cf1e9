//! Structured event log: JSONL file fed by a dedicated logger thread.

pub mod events;
pub mod jsonl;
