//! Thumbnail Worker
//!
//! Queue-driven worker that consumes storage-upload notifications, fetches
//! each image from object storage, generates a bounded-size thumbnail, and
//! writes it back under a destination prefix. The triggering notification
//! is acknowledged only after the thumbnail is uploaded, giving
//! at-least-once processing semantics.

pub mod config;
pub mod error;
pub mod notification;
pub mod queue;
pub mod services;
pub mod storage;

// Public re-exports
pub use config::Config;
pub use error::{Result, WorkerError};
