//! Placement group sizing for storage pools.
//!
//! The allocators in [`pg`] are pure functions of their inputs. Everything
//! around them (inventory loading, cluster map, playbook rendering) lives in
//! the remaining modules.

pub mod cluster;
pub mod error;
pub mod inventory;
pub mod pg;
pub mod plan;
pub mod playbook;

pub use error::{AllocationError, ConfigurationError, InventoryError, InvariantError};
pub use pg::{
    allocate_multi_size, allocate_single_size, round_pow2, round_pow2_with, Allocation,
    MultiSizeParams, PoolSpec, SingleSizeParams, DEFAULT_KEY, DEFAULT_ROUND_THRESHOLD,
};
