use tracing::{debug, info, warn};

use crate::error::InventoryError;
use crate::inventory::{Inventory, PoolTable};
use crate::pg::{
    allocate_multi_size, allocate_single_size, Allocation, MultiSizeParams, PoolSpec,
    SingleSizeParams,
};

/// Which allocator produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SingleSize,
    MultiSize,
}

/// Command line adjustments applied on top of the inventory.
#[derive(Debug, Default, Clone)]
pub struct PlanOverrides {
    pub pg_per_osd: Option<u32>,
}

/// PG counts for one cluster, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPlan {
    pub cluster: String,
    pub osd_count: u32,
    pub mode: Mode,
    pub allocation: Allocation,
}

/// Count the OSDs of `inv` and size its pools.
pub fn plan(inv: &Inventory, overrides: &PlanOverrides) -> Result<PoolPlan, InventoryError> {
    let map = inv.cluster_map()?;
    let osd_count = map.osd_count();
    info!(
        "cluster {}: {} osds in on [{}], {} pools",
        inv.cluster,
        osd_count,
        map.hosts().join(", "),
        inv.pools.len()
    );

    let (mode, allocation) = match &inv.pools {
        PoolTable::Weighted(pools) => {
            let params = SingleSizeParams {
                pg_per_osd: overrides.pg_per_osd.unwrap_or(inv.pg_per_osd),
                min_pg_per_pool_per_osd: inv.min_pg_per_pool_per_osd,
            };
            debug!("single size mode, size={} {:?}", inv.pool_default_size, params);
            let alloc = allocate_single_size(
                osd_count,
                inv.pool_default_size,
                pools.iter().map(|(name, &w)| (name.as_str(), w)),
                &params,
            )?;
            (Mode::SingleSize, alloc)
        }
        PoolTable::Sized(pools) => {
            if overrides.pg_per_osd.is_some() {
                warn!("pg per osd is ignored for pools with individual sizes");
            }
            let params = MultiSizeParams {
                min_pg_copies_per_osd: inv.min_pgc_per_osd,
                max_pg_copies_per_osd: inv.max_pgc_per_osd,
                min_pg_copies_per_pool_per_osd: inv.min_pg_per_pool_per_osd,
                default_replication_size: inv.pool_default_size,
            };
            debug!("multi size mode {:?}", params);
            let alloc = allocate_multi_size(
                osd_count,
                pools
                    .iter()
                    .map(|(name, &(w, size))| (name.as_str(), PoolSpec::new(w, size))),
                &params,
            )?;
            (Mode::MultiSize, alloc)
        }
    };

    for (name, pg) in &allocation.pools {
        debug!("pool {}: pg_num={}", name, pg);
    }
    info!("default pg_num={}", allocation.default_pg_num);

    Ok(PoolPlan {
        cluster: inv.cluster.clone(),
        osd_count,
        mode,
        allocation,
    })
}
