//! Watches a beacon chain on behalf of a set of validators and exposes, as Prometheus metrics,
//! whether their block proposals made it to the head and to finality, which sync committees
//! they sit in and what they earned for it.

pub mod alert;
pub mod beacon;
mod block_reward;
pub mod cli;
pub mod config;
pub mod duties;
mod error;
pub mod labels;
pub mod logger;
pub mod metrics;
mod missed_blocks;
mod next_blocks_proposal;
pub mod relays;
pub mod server;
pub mod service;
mod sync_committee;
mod sync_committee_reward;
#[cfg(test)]
mod test_utils;
pub mod validators;
mod watcher;

pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::watcher::Watcher;
