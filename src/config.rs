//! Construction parameters.
//!
//! All structs deserialize with per-field defaults, so a partial document
//! (or `{}`) is a valid configuration. JSON has no infinity literal: omit
//! `initial_priority` to get the `+inf` default.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::PriorityIndex;
use crate::scheduler::EpochScheduler;

fn default_initial_priority() -> f64 {
    f64::INFINITY
}

fn is_pos_inf(v: &f64) -> bool {
    v.is_infinite() && v.is_sign_positive()
}

fn default_visit_threshold() -> u32 {
    u32::MAX
}

fn default_warmup_epochs() -> u32 {
    1
}

/// Parameters for [`PriorityIndex`](crate::PriorityIndex).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Priority every id starts with. The `+inf` default puts every
    /// unvisited id ahead of every visited one.
    #[serde(
        default = "default_initial_priority",
        skip_serializing_if = "is_pos_inf"
    )]
    pub initial_priority: f64,
    /// Number of visits after which an id is evicted.
    #[serde(default = "default_visit_threshold")]
    pub visit_threshold: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_priority: default_initial_priority(),
            visit_threshold: default_visit_threshold(),
        }
    }
}

impl IndexConfig {
    /// Check the parameters that do not depend on the universe size.
    pub fn validate(&self) -> Result<()> {
        if self.visit_threshold == 0 {
            return Err(Error::ZeroVisitThreshold);
        }
        if self.initial_priority.is_nan() {
            return Err(Error::UndefinedInitialPriority);
        }
        Ok(())
    }
}

/// Parameters for [`EpochScheduler`](crate::EpochScheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Epochs enumerated in full before priority ordering takes over.
    #[serde(default = "default_warmup_epochs")]
    pub warmup_epochs: u32,
    /// Shuffle the warm-up order instead of enumerating `0..N`.
    #[serde(default)]
    pub shuffle: bool,
    /// Seed for the warm-up shuffle. `None` draws from the thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            warmup_epochs: default_warmup_epochs(),
            shuffle: false,
            seed: None,
        }
    }
}

/// Combined configuration for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SamplerConfig {
    /// Check the index parameters; every scheduler config is valid.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()
    }

    /// Build the index for a dataset of `size` items.
    pub fn build_index(&self, size: usize) -> Result<PriorityIndex> {
        PriorityIndex::from_config(size, &self.index)
    }

    /// Build a scheduler in its initial phase.
    pub fn build_scheduler(&self) -> EpochScheduler {
        EpochScheduler::from_config(&self.scheduler)
    }
}
