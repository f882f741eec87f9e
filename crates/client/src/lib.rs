//! HTTP client for the video job API.
//!
//! Provides the [`JobSource`], [`JobMutator`] and [`PushRegistrar`] seams
//! the tracking engine is written against, and [`JobsApi`], their
//! `reqwest`-backed implementation.

pub mod api;
pub mod error;
pub mod push;
pub mod traits;

pub use api::JobsApi;
pub use error::ClientError;
pub use push::PushEnrollment;
pub use traits::{JobMutator, JobSource, PushRegistrar};
