//! PG count allocation.
//!
//! Two allocators share the power-of-two rounder in [`round`]:
//! [`allocate_single_size`] for clusters where every pool uses one
//! replication size, and [`allocate_multi_size`] for pools that declare
//! their own size and share a budget counted in PG copies.

mod multi;
mod round;
mod single;

use std::collections::BTreeMap;

use crate::error::ConfigurationError;

pub use multi::{allocate_multi_size, MultiSizeParams, PoolSpec};
pub use round::{round_pow2, round_pow2_with, DEFAULT_ROUND_THRESHOLD};
pub use single::{allocate_single_size, SingleSizeParams};

/// Key holding the PG count for pools not named in the request.
pub const DEFAULT_KEY: &str = "default_pg_num";

/// Result of one allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// PG count for any pool not present in `pools`.
    pub default_pg_num: u64,
    /// PG count per named pool.
    pub pools: BTreeMap<String, u64>,
}

impl Allocation {
    /// Flatten into a single map, with the default under [`DEFAULT_KEY`].
    pub fn to_map(&self) -> BTreeMap<String, u64> {
        let mut res = self.pools.clone();
        res.insert(DEFAULT_KEY.to_string(), self.default_pg_num);
        res
    }

    /// Sum of `pg_count * size` over the named pools.
    pub fn total_copies(&self, size_of: impl Fn(&str) -> u32) -> u64 {
        self.pools
            .iter()
            .map(|(name, pg)| pg * size_of(name) as u64)
            .sum()
    }
}

fn check_osd_count(osd_count: u32, size: u32) -> Result<(), ConfigurationError> {
    if osd_count < 2 {
        return Err(ConfigurationError::TooFewOsds { osd_count });
    }
    if size == 0 {
        return Err(ConfigurationError::ZeroReplicationSize);
    }
    if osd_count < size {
        return Err(ConfigurationError::SizeExceedsOsds { osd_count, size });
    }
    Ok(())
}

fn check_weight(pool: &str, weight: f64) -> Result<(), ConfigurationError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ConfigurationError::InvalidWeight {
            pool: pool.to_string(),
            weight,
        });
    }
    Ok(())
}

/// Normalise request pools into a name-ordered map.
///
/// Every later floating-point sum walks this map, so the result does not
/// depend on the order the caller supplied the pools in.
fn collect_pools<K, V, I>(pools: I) -> Result<BTreeMap<String, V>, ConfigurationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
{
    let mut res = BTreeMap::new();
    for (name, value) in pools {
        let name = name.into();
        if name == DEFAULT_KEY {
            return Err(ConfigurationError::ReservedPoolName(name));
        }
        if res.contains_key(&name) {
            return Err(ConfigurationError::DuplicatePool(name));
        }
        res.insert(name, value);
    }
    Ok(res)
}
