use std::collections::BTreeMap;

use super::{check_osd_count, check_weight, collect_pools, round_pow2, Allocation};
use crate::error::{AllocationError, ConfigurationError};

/// Tuning for [`allocate_single_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleSizeParams {
    /// Target PG count per OSD. The real figure ends up higher, up to twice
    /// this, because of power-of-two rounding.
    pub pg_per_osd: u32,
    /// Minimal PG per pool per OSD.
    pub min_pg_per_pool_per_osd: u32,
}

impl Default for SingleSizeParams {
    fn default() -> Self {
        Self {
            pg_per_osd: 200,
            min_pg_per_pool_per_osd: 2,
        }
    }
}

/// Calculate PG counts for pools sharing one replication size.
///
/// `pools` yields `(name, weight)`. A weight of 0 marks a small pool that
/// only gets the floor of `osd_count * min_pg_per_pool_per_osd / pool_size`
/// PGs. The rest of the `pg_per_osd * osd_count / pool_size` budget is split
/// between the weighted pools proportionally, each share rounded up to a
/// power of two and never below the floor.
pub fn allocate_single_size<K, I>(
    osd_count: u32,
    pool_size: u32,
    pools: I,
    params: &SingleSizeParams,
) -> Result<Allocation, AllocationError>
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    check_osd_count(osd_count, pool_size)?;
    let pools = collect_pools(pools)?;
    for (name, &weight) in &pools {
        check_weight(name, weight)?;
    }

    let total_pg = params.pg_per_osd as f64 / pool_size as f64 * osd_count as f64;
    let total_weight: f64 = pools.values().sum();
    let minimal_pg = round_pow2(
        osd_count as f64 * params.min_pg_per_pool_per_osd as f64 / pool_size as f64,
    )?;

    let (default_pg_num, pg_per_weight) = if total_weight == 0.0 {
        if pools.is_empty() {
            // only the default matters, as if there were a single pool
            return Ok(Allocation {
                default_pg_num: round_pow2(total_pg)?,
                pools: BTreeMap::new(),
            });
        }
        let even = round_pow2(total_pg / pools.len() as f64)?;
        (minimal_pg.max(even), 0.0)
    } else {
        let small_pool_count = pools.values().filter(|&&w| w == 0.0).count();
        let left = total_pg - minimal_pg as f64 * small_pool_count as f64;
        (minimal_pg, (left / total_weight).max(0.0))
    };

    let pools = pools
        .into_iter()
        .map(|(name, weight)| {
            let pg = round_pow2(weight * pg_per_weight)?.max(default_pg_num);
            Ok((name, pg))
        })
        .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;

    Ok(Allocation {
        default_pg_num,
        pools,
    })
}
