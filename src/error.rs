use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the allocators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    /// caller input
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// allocator defect
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

impl AllocationError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AllocationError::Configuration(_))
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, AllocationError::Invariant(_))
    }
}

/// Bad input: the request cannot produce a meaningful allocation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("there should be at least 2 osd, got {osd_count}")]
    TooFewOsds { osd_count: u32 },

    #[error("osd count ({osd_count}) should be >= replication size ({size})")]
    SizeExceedsOsds { osd_count: u32, size: u32 },

    #[error("replication size must be at least 1")]
    ZeroReplicationSize,

    #[error("pool `{pool}` has invalid weight {weight}")]
    InvalidWeight { pool: String, weight: f64 },

    #[error("pool `{0}` is listed more than once")]
    DuplicatePool(String),

    #[error("pool name `{0}` is reserved")]
    ReservedPoolName(String),

    #[error("cannot round {0} to a power of two")]
    InvalidValue(f64),

    #[error("{0} is too large to be a pg count")]
    ValueOutOfRange(f64),

    #[error("max pg copies per osd ({max}) is below min pg copies per osd ({min})")]
    InvalidCopyRange { min: u32, max: u32 },

    #[error("pool floors need {required} pg copies but only {available} fit under the ceiling")]
    BudgetExceeded { required: u64, available: u64 },
}

/// Post-allocation checks that can only fail through a logic defect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantError {
    #[error("allocated {sum} pg copies, below the floor of {floor}")]
    BelowFloor { sum: u64, floor: f64 },

    #[error("pool `{pool}` holds {copies} pg copies, not divisible by size {size}")]
    UnevenCopies { pool: String, copies: u64, size: u32 },
}

/// Errors raised while turning an inventory into a pool plan.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid inventory: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inventory has no osd hosts")]
    NoOsdHosts,

    #[error("host `{host}` marks unknown device `{device}` out")]
    UnknownOutDevice { host: String, device: String },

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
