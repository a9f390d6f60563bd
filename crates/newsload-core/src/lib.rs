//! Core types and the dimension-resolution / batch-load pipeline for the
//! news click warehouse.
//!
//! This crate has no database dependencies. Storage backends
//! implement [`store::LoadSession`] and [`store::DimensionStore`]; the
//! pipeline in [`orchestrator`] drives them.

pub mod batcher;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod value;

pub use error::{Error, Result};

#[cfg(test)]
mod memory;
