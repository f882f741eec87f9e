//! Job tracking engine for ReelWatch.
//!
//! - [`store`]: the job snapshot store and the observable [`JobsView`].
//! - [`scheduler`]: the generation-guarded [`PollScheduler`].
//! - [`diff`]: the [`PreviousStatusMap`] status diff detector.
//! - [`reconciler`]: optimistic mutations and their recovery.
//! - [`settings`]: durable notification settings.
//! - [`tracker`]: the [`TrackerEngine`] facade tying it all together.

pub mod config;
pub mod diff;
pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod tracker;

pub use config::EngineConfig;
pub use diff::PreviousStatusMap;
pub use error::EngineError;
pub use reconciler::MutationPhase;
pub use scheduler::{Generation, PollScheduler};
pub use settings::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore, SettingsStoreError};
pub use store::{JobStore, JobsView};
pub use tracker::{PollOutcome, TrackerEngine, TrackerEngineBuilder, TransitionObserver};
