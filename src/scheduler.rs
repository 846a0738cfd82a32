//! Epoch scheduling: warm-up sweeps, then priority order.
//!
//! For the first `warmup_epochs` epochs every id is enumerated exactly once
//! (sequentially, shuffled, or in a caller-supplied permutation), whatever
//! priorities get reported meanwhile. After that the scheduler switches for
//! good to [`PriorityIndex::next_batch`].
//!
//! The scheduler does not hold the index. Each [`Epoch`] borrows it per
//! batch, so the caller is free to `update` between batches.

use rand::prelude::*;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::index::PriorityIndex;

/// Which enumeration an epoch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Every id once per epoch, priorities ignored.
    Warmup,
    /// Highest priority first.
    Priority,
}

/// Decides, per epoch, how ids are enumerated.
#[derive(Debug, Clone)]
pub struct EpochScheduler {
    warmup_epochs: u32,
    completed: u32,
    phase: Phase,
    shuffle: bool,
    seed: Option<u64>,
}

impl Default for EpochScheduler {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl EpochScheduler {
    /// Sequential warm-up for `warmup_epochs` epochs.
    pub fn new(warmup_epochs: u32) -> Self {
        Self::from_config(&SchedulerConfig {
            warmup_epochs,
            ..SchedulerConfig::default()
        })
    }

    /// Build from a [`SchedulerConfig`]; starts in `Priority` when
    /// `warmup_epochs` is zero.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let phase = if config.warmup_epochs == 0 {
            Phase::Priority
        } else {
            Phase::Warmup
        };
        Self {
            warmup_epochs: config.warmup_epochs,
            completed: 0,
            phase,
            shuffle: config.shuffle,
            seed: config.seed,
        }
    }

    /// Shuffle warm-up epochs.
    ///
    /// With a seed, epoch `e` is shuffled with `seed + e`, so runs are
    /// reproducible; without one the thread RNG is used.
    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Phase the next epoch will run in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Configured number of warm-up epochs.
    pub fn warmup_epochs(&self) -> u32 {
        self.warmup_epochs
    }

    /// Epochs closed with [`finish_epoch`](Self::finish_epoch).
    pub fn completed_epochs(&self) -> u32 {
        self.completed
    }

    /// Start the next epoch.
    pub fn begin_epoch(&self, index: &PriorityIndex) -> Epoch {
        if self.phase == Phase::Priority {
            return self.start(index, Vec::new());
        }
        if self.shuffle {
            let mut rng: Box<dyn RngCore> = match self.seed {
                Some(s) => Box::new(StdRng::seed_from_u64(
                    s.wrapping_add(u64::from(self.completed)),
                )),
                None => Box::new(rand::rng()),
            };
            return self.begin_epoch_with_rng(index, &mut rng);
        }
        self.start(index, (0..index.size()).collect())
    }

    /// Start the next epoch, shuffling a warm-up order with a caller-supplied
    /// RNG. Priority epochs ignore `rng`.
    pub fn begin_epoch_with_rng<R: Rng + ?Sized>(
        &self,
        index: &PriorityIndex,
        rng: &mut R,
    ) -> Epoch {
        if self.phase == Phase::Priority {
            return self.start(index, Vec::new());
        }
        let mut order: Vec<usize> = (0..index.size()).collect();
        order.shuffle(rng);
        self.start(index, order)
    }

    /// Start the next epoch with a caller-supplied warm-up order.
    ///
    /// `order` must be a permutation of `0..index.size()`. Priority epochs
    /// ignore it.
    pub fn begin_epoch_with_order(
        &self,
        index: &PriorityIndex,
        order: Vec<usize>,
    ) -> Result<Epoch> {
        if self.phase == Phase::Warmup {
            check_permutation(&order, index.size())?;
        }
        Ok(self.start(index, order))
    }

    /// Close an epoch and advance the phase.
    pub fn finish_epoch(&mut self, epoch: Epoch) {
        self.completed = self.completed.saturating_add(1);
        debug!(
            epoch = epoch.number,
            phase = ?epoch.phase,
            drawn = epoch.drawn,
            "finished epoch"
        );
        if self.phase == Phase::Warmup && self.completed >= self.warmup_epochs {
            self.phase = Phase::Priority;
            info!(
                warmup_epochs = self.warmup_epochs,
                "warm-up complete, switching to priority order"
            );
        }
    }

    fn start(&self, index: &PriorityIndex, order: Vec<usize>) -> Epoch {
        let source = match self.phase {
            Phase::Warmup => Source::Sweep { order, cursor: 0 },
            Phase::Priority => Source::Ranked {
                remaining: index.active_count(),
            },
        };
        debug!(
            epoch = self.completed,
            phase = ?self.phase,
            active = index.active_count(),
            "began epoch"
        );
        Epoch {
            number: self.completed,
            phase: self.phase,
            drawn: 0,
            source,
        }
    }
}

fn check_permutation(order: &[usize], size: usize) -> Result<()> {
    let invalid = |reason: String| Error::InvalidOrder { size, reason };
    if order.len() != size {
        return Err(invalid(format!("length {}", order.len())));
    }
    let mut seen = vec![false; size];
    for &id in order {
        match seen.get_mut(id) {
            None => return Err(invalid(format!("id {id} out of range"))),
            Some(true) => return Err(invalid(format!("id {id} repeated"))),
            Some(slot) => *slot = true,
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Source {
    /// Warm-up: a fixed order walked once.
    Sweep { order: Vec<usize>, cursor: usize },
    /// Priority: as many draws as ids were active at epoch start.
    Ranked { remaining: usize },
}

/// One pass over the data, produced by [`EpochScheduler::begin_epoch`].
#[derive(Debug, Clone)]
pub struct Epoch {
    number: u32,
    phase: Phase,
    drawn: usize,
    source: Source,
}

impl Epoch {
    /// Zero-based epoch number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Phase this epoch was started in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ids handed out so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    /// Next batch of up to `k` ids, or `None` once the epoch is exhausted.
    ///
    /// Warm-up batches skip evicted ids. Priority batches reflect every
    /// update reported before this call.
    pub fn next_batch(&mut self, index: &PriorityIndex, k: usize) -> Option<Vec<usize>> {
        if k == 0 {
            return None;
        }
        let batch = match &mut self.source {
            Source::Sweep { order, cursor } => {
                let mut batch = Vec::with_capacity(k.min(order.len() - *cursor));
                while batch.len() < k && *cursor < order.len() {
                    let id = order[*cursor];
                    *cursor += 1;
                    if index.is_active(id) {
                        batch.push(id);
                    }
                }
                batch
            }
            Source::Ranked { remaining } => {
                let batch = index.next_batch(k.min(*remaining));
                *remaining = if batch.is_empty() {
                    0
                } else {
                    *remaining - batch.len()
                };
                batch
            }
        };
        if batch.is_empty() {
            return None;
        }
        self.drawn += batch.len();
        Some(batch)
    }
}
