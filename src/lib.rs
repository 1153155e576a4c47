//! Configurable event processing: conditionally gated transforms over a
//! concurrent, flush-aware streaming pipeline.

pub mod app;
pub mod buffer;
pub mod condition;
pub mod config;
pub mod engine;
pub mod io;
pub mod message;
pub mod prelude;
pub mod storage;
pub mod streaming;
pub mod transform;
