//! Change-triggered hunt statistics for a game overlay.
//!
//! A [`GameStateProvider`](provider::GameStateProvider) supplies one
//! [`Snapshot`](snapshot::Snapshot) per poll; the [`Sampler`](sampler::Sampler)
//! diffs it into per-quantity histories and chart series, and hands each
//! finished quest to a [`RunSink`](run_log::RunSink).

pub mod address_map;
pub mod config;
pub mod errors;
pub mod history;
pub mod memory;
pub mod plot;
pub mod provider;
pub mod quantity;
pub mod run_log;
pub mod sampler;
pub mod snapshot;

pub use errors::{Result, TrackerError};
pub use quantity::Quantity;
pub use sampler::{Sampler, SamplerState, SessionRecord, TickReport};
pub use snapshot::Snapshot;
