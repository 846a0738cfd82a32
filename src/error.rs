//! Error types.

use thiserror::Error;

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid construction parameters or an undefined priority value.
    Config,
    /// An update referenced an id that is unknown or already evicted.
    Lookup,
}

/// Errors raised by the index and the scheduler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The index universe must contain at least one id.
    #[error("index size must be > 0")]
    EmptyUniverse,

    /// Visit threshold must be positive.
    #[error("visit threshold must be > 0")]
    ZeroVisitThreshold,

    /// NaN initial priority.
    #[error("initial priority must not be NaN")]
    UndefinedInitialPriority,

    /// NaN priority reported for an id.
    #[error("priority for id {id} must not be NaN")]
    UndefinedPriority { id: usize },

    /// `ids` and `priorities` differ in length.
    #[error("update got {ids} ids but {priorities} priorities")]
    LengthMismatch { ids: usize, priorities: usize },

    /// A warm-up order that is not a permutation of the universe.
    #[error("warm-up order is not a permutation of 0..{size}: {reason}")]
    InvalidOrder { size: usize, reason: String },

    /// Id outside `0..size`.
    #[error("unknown id {id} (index size {size})")]
    UnknownId { id: usize, size: usize },

    /// Id evicted after reaching the visit threshold.
    #[error("id {id} was evicted after {visits} visits")]
    Evicted { id: usize, visits: u32 },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownId { .. } | Self::Evicted { .. } => ErrorKind::Lookup,
            Self::EmptyUniverse
            | Self::ZeroVisitThreshold
            | Self::UndefinedInitialPriority
            | Self::UndefinedPriority { .. }
            | Self::LengthMismatch { .. }
            | Self::InvalidOrder { .. } => ErrorKind::Config,
        }
    }

    /// True for [`ErrorKind::Config`].
    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    /// True for [`ErrorKind::Lookup`].
    pub fn is_lookup(&self) -> bool {
        self.kind() == ErrorKind::Lookup
    }
}
