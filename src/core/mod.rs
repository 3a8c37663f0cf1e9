//! Core types: errors, configuration, tool directory layout.

pub mod config;
pub mod errors;
pub mod paths;
