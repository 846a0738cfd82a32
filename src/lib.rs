//! `kuji-prio`: priority sampling with staleness eviction.
//!
//! A training loop draws the highest-loss items first and reports fresh
//! losses back; items seen too often are retired. The crate only deals in
//! `(id, priority)` pairs and knows nothing about models or tensors.
//!
//! Exposed modules:
//! - `index`: [`PriorityIndex`], exact descending-priority order over ids
//!   `0..N` with visit counting and eviction.
//! - `scheduler`: [`EpochScheduler`], warm-up sweeps before priority order.
//! - `shared`: [`SharedIndex`], a mutex-guarded handle for prefetching workers.
//! - `config`: serde-loadable construction parameters.
//!
//! ```
//! use kuji_prio::{EpochScheduler, PriorityIndex};
//!
//! let mut index = PriorityIndex::new(3, f64::INFINITY, 4)?;
//! let mut scheduler = EpochScheduler::new(1);
//!
//! let mut epoch = scheduler.begin_epoch(&index);
//! while let Some(batch) = epoch.next_batch(&index, 2) {
//!     let losses: Vec<f64> = batch.iter().map(|&id| id as f64).collect();
//!     index.update(&batch, &losses)?;
//! }
//! scheduler.finish_epoch(epoch);
//!
//! let mut epoch = scheduler.begin_epoch(&index);
//! assert_eq!(epoch.next_batch(&index, 3), Some(vec![2, 1, 0]));
//! # Ok::<(), kuji_prio::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod index;
pub mod scheduler;
pub mod shared;

pub use config::{IndexConfig, SamplerConfig, SchedulerConfig};
pub use error::{Error, ErrorKind, Result};
pub use index::{PriorityIndex, UpdateReport, Visit};
pub use scheduler::{Epoch, EpochScheduler, Phase};
pub use shared::SharedIndex;
