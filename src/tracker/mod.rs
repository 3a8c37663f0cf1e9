//! Sampling engine: classification, typing and idle inference, span merging.

pub mod classifier;
pub mod idle;
pub mod input;
pub mod runtime;
pub mod sampler;
pub mod store;
