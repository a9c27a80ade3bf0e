use std::collections::BTreeMap;

use super::{check_osd_count, check_weight, collect_pools, round_pow2, Allocation};
use crate::error::{AllocationError, ConfigurationError, InvariantError};
use crate::pg::DEFAULT_ROUND_THRESHOLD;

/// A pool in a multi-size request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSpec {
    pub weight: f64,
    /// Copies kept of each PG.
    pub size: u32,
}

impl PoolSpec {
    pub fn new(weight: f64, size: u32) -> Self {
        Self { weight, size }
    }
}

/// Tuning for [`allocate_multi_size`]. All bounds are in PG copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiSizeParams {
    pub min_pg_copies_per_osd: u32,
    pub max_pg_copies_per_osd: u32,
    pub min_pg_copies_per_pool_per_osd: u32,
    /// Size assumed for pools not named in the request.
    pub default_replication_size: u32,
}

impl Default for MultiSizeParams {
    fn default() -> Self {
        Self {
            min_pg_copies_per_osd: 100,
            max_pg_copies_per_osd: 300,
            min_pg_copies_per_pool_per_osd: 2,
            default_replication_size: 3,
        }
    }
}

/// Calculate PG counts for pools with individual replication sizes.
///
/// Budgeting is done in PG copies (`pg_count * size`). Zero-weight pools get
/// the per-pool floor, the rest of `osd_count * min_pg_copies_per_osd` is
/// split by weight, and whatever room is left under
/// `osd_count * max_pg_copies_per_osd` is handed out by doubling pools,
/// lightest first.
pub fn allocate_multi_size<K, I>(
    osd_count: u32,
    pools: I,
    params: &MultiSizeParams,
) -> Result<Allocation, AllocationError>
where
    I: IntoIterator<Item = (K, PoolSpec)>,
    K: Into<String>,
{
    check_osd_count(osd_count, 1)?;
    if params.default_replication_size == 0 {
        return Err(ConfigurationError::ZeroReplicationSize.into());
    }
    if params.max_pg_copies_per_osd < params.min_pg_copies_per_osd {
        return Err(ConfigurationError::InvalidCopyRange {
            min: params.min_pg_copies_per_osd,
            max: params.max_pg_copies_per_osd,
        }
        .into());
    }
    let mut pools = collect_pools(pools)?;
    for (name, spec) in &pools {
        check_weight(name, spec.weight)?;
        check_osd_count(osd_count, spec.size)?;
    }

    let osds = osd_count as u64;
    let min_total = osds * params.min_pg_copies_per_osd as u64;
    let max_total = osds * params.max_pg_copies_per_osd as u64;
    let default_pg_num =
        round_pow2(min_total as f64 / params.default_replication_size as f64)?;

    if pools.is_empty() {
        return Ok(Allocation {
            default_pg_num,
            pools: BTreeMap::new(),
        });
    }

    let mut sum_weight: f64 = pools.values().map(|p| p.weight).sum();
    if sum_weight == 0.0 {
        // nothing to go by, split evenly
        for spec in pools.values_mut() {
            spec.weight = 1.0;
        }
        sum_weight = pools.len() as f64;
    }

    let min_copies = (osds * params.min_pg_copies_per_pool_per_osd as u64) as f64;

    let mut copies: BTreeMap<&str, u64> = BTreeMap::new();
    for (name, spec) in pools.iter().filter(|(_, p)| p.weight == 0.0) {
        let pg = round_pow2(min_copies / spec.size as f64)?;
        copies.insert(name.as_str(), pg_copies(pg, spec.size)?);
    }
    let reserved = total_copies(&copies)?;

    let copies_per_weight = (min_total as f64 - reserved as f64) / sum_weight;
    for (name, spec) in pools.iter().filter(|(_, p)| p.weight != 0.0) {
        let want = (copies_per_weight * spec.weight).max(min_copies);
        let pg = round_pow2(want / spec.size as f64)?;
        copies.insert(name.as_str(), pg_copies(pg, spec.size)?);
    }

    let current = total_copies(&copies)?;
    // each pool may round down by at most the rounder's tolerance
    let floor = min_total as f64 * 2f64.powf(-DEFAULT_ROUND_THRESHOLD);
    if (current as f64) < floor {
        return Err(InvariantError::BelowFloor {
            sum: current,
            floor,
        }
        .into());
    }
    if current > max_total {
        return Err(ConfigurationError::BudgetExceeded {
            required: current,
            available: max_total,
        }
        .into());
    }

    let mut free = max_total - current;
    let mut by_weight: Vec<(f64, &str)> = pools
        .iter()
        .filter(|(_, p)| p.weight != 0.0)
        .map(|(name, p)| (p.weight, name.as_str()))
        .collect();
    by_weight.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let mut changed = true;
    while changed {
        changed = false;
        for (_, name) in &by_weight {
            let Some(curr) = copies.get_mut(name) else {
                continue;
            };
            // an empty pool cannot grow by doubling
            if *curr != 0 && *curr <= free {
                free -= *curr;
                *curr *= 2;
                changed = true;
            }
        }
    }

    let total = max_total - free;
    if total < min_total {
        return Err(InvariantError::BelowFloor {
            sum: total,
            floor: min_total as f64,
        }
        .into());
    }

    let mut res = BTreeMap::new();
    for (name, spec) in &pools {
        let c = copies.get(name.as_str()).copied().unwrap_or_default();
        let size = spec.size as u64;
        if c % size != 0 {
            return Err(InvariantError::UnevenCopies {
                pool: name.clone(),
                copies: c,
                size: spec.size,
            }
            .into());
        }
        res.insert(name.clone(), c / size);
    }

    Ok(Allocation {
        default_pg_num,
        pools: res,
    })
}

fn pg_copies(pg: u64, size: u32) -> Result<u64, ConfigurationError> {
    pg.checked_mul(size as u64)
        .ok_or(ConfigurationError::ValueOutOfRange(pg as f64 * size as f64))
}

fn total_copies(copies: &BTreeMap<&str, u64>) -> Result<u64, ConfigurationError> {
    copies
        .values()
        .try_fold(0u64, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| {
            ConfigurationError::ValueOutOfRange(copies.values().map(|&c| c as f64).sum())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn alloc(osd: u32, pools: &[(&str, f64, u32)]) -> Result<Allocation, AllocationError> {
        allocate_multi_size(
            osd,
            pools.iter().map(|&(n, w, s)| (n, PoolSpec::new(w, s))),
            &MultiSizeParams::default(),
        )
    }

    fn copies(res: &Allocation, pools: &[(&str, f64, u32)]) -> u64 {
        res.total_copies(|name| {
            pools
                .iter()
                .find(|p| p.0 == name)
                .map(|p| p.2)
                .unwrap_or_default()
        })
    }

    #[test]
    fn no_pools() {
        let res = alloc(10, &[]).unwrap();
        assert_eq!(res.default_pg_num, 512);
        assert!(res.pools.is_empty());
    }

    #[test]
    fn single_pool() {
        // 1000/3 copies -> 512 PGs; 1536 copies do not fit the 1464 left to double
        let pools = [("rbd", 1.0, 3)];
        let res = alloc(10, &pools).unwrap();
        assert_eq!(res.pools["rbd"], 512);
        assert_eq!(copies(&res, &pools), 1536);
    }

    #[test]
    fn mixed_sizes() {
        let pools = [("rbd", 3.0, 3), ("ec", 1.0, 2), ("meta", 0.0, 3)];
        let res = alloc(10, &pools).unwrap();
        // meta: floor of 20 copies -> round_pow2(6.67) = 8 PGs
        assert_eq!(res.pools["meta"], 8);
        // 976 copies left, 244 per weight: ec 244/2 -> 128 PGs, rbd 732/3 -> 256 PGs.
        // 1952 free copies: ec doubles twice, rbd once.
        assert_eq!(res.pools["ec"], 512);
        assert_eq!(res.pools["rbd"], 512);
        let total = copies(&res, &pools);
        assert!(total >= 1000 && total <= 3000, "{}", total);
    }

    #[test]
    fn all_zero_weights_split_evenly() {
        let pools = [("a", 0.0, 3), ("b", 0.0, 3)];
        let res = alloc(10, &pools).unwrap();
        // both start at 256 PGs; the name tie-break lets `a` double first
        assert_eq!(res.pools["a"], 512);
        assert_eq!(res.pools["b"], 256);
        let total = copies(&res, &pools);
        assert!(total >= 1000 && total <= 3000, "{}", total);
    }

    #[test]
    fn floor_is_checked_against_values() {
        // Summing pool names instead of copy counts would break here.
        let pools = [("a", 1.0, 1), ("b", 1.0, 1)];
        let res = alloc(41, &pools).unwrap();
        // 2050 copies each round to 2048 within tolerance, then doubling
        assert_eq!(res.pools["a"], 8192);
        assert_eq!(res.pools["b"], 4096);
        assert!(copies(&res, &pools) <= 41 * 300);
    }

    #[test]
    fn doubling_prefers_light_pools_then_names() {
        let pools = [("b", 1.0, 1), ("a", 1.0, 1), ("heavy", 2.0, 1)];
        let params = MultiSizeParams {
            min_pg_copies_per_osd: 100,
            max_pg_copies_per_osd: 150,
            min_pg_copies_per_pool_per_osd: 2,
            default_replication_size: 1,
        };
        // 250 per weight: a, b -> 256; heavy -> 512; free = 1500 - 1024 = 476
        let res = allocate_multi_size(
            10,
            pools.iter().map(|&(n, w, s)| (n, PoolSpec::new(w, s))),
            &params,
        )
        .unwrap();
        assert_eq!(res.pools["a"], 512);
        assert_eq!(res.pools["b"], 256);
        assert_eq!(res.pools["heavy"], 512);
    }

    #[test]
    fn configuration_errors() {
        let err = alloc(1, &[("a", 1.0, 1)]).unwrap_err();
        assert!(err.is_configuration());

        let err = alloc(2, &[("a", 1.0, 3)]).unwrap_err();
        assert!(err.is_configuration());

        let err = alloc(10, &[("a", 1.0, 0)]).unwrap_err();
        assert_eq!(
            err,
            AllocationError::Configuration(ConfigurationError::ZeroReplicationSize)
        );

        let err = alloc(10, &[("a", -2.0, 3)]).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Configuration(ConfigurationError::InvalidWeight { .. })
        ));

        let params = MultiSizeParams {
            min_pg_copies_per_osd: 300,
            max_pg_copies_per_osd: 100,
            ..Default::default()
        };
        let err = allocate_multi_size(10, [("a", PoolSpec::new(1.0, 3))], &params).unwrap_err();
        assert_eq!(
            err,
            AllocationError::Configuration(ConfigurationError::InvalidCopyRange {
                min: 300,
                max: 100
            })
        );
    }

    #[test]
    fn empty_pools_do_not_stall_doubling() {
        let params = MultiSizeParams {
            min_pg_copies_per_osd: 0,
            max_pg_copies_per_osd: 10,
            min_pg_copies_per_pool_per_osd: 0,
            default_replication_size: 3,
        };
        let res = allocate_multi_size(
            4,
            [("a", PoolSpec::new(1.0, 2)), ("z", PoolSpec::new(0.0, 2))],
            &params,
        )
        .unwrap();
        assert_eq!(res.pools["a"], 0);
        assert_eq!(res.pools["z"], 0);
        assert_eq!(res.default_pg_num, 0);
    }

    #[test]
    fn rounding_gap_left_under_tight_ceiling() {
        // 2050 copies each round to 2048, and a 110 ceiling leaves no room to double
        let params = MultiSizeParams {
            min_pg_copies_per_osd: 100,
            max_pg_copies_per_osd: 110,
            min_pg_copies_per_pool_per_osd: 2,
            default_replication_size: 1,
        };
        let err = allocate_multi_size(
            41,
            [("a", PoolSpec::new(1.0, 1)), ("b", PoolSpec::new(1.0, 1))],
            &params,
        )
        .unwrap_err();
        assert!(err.is_invariant());
        assert!(!err.is_configuration());
        assert_eq!(
            err,
            AllocationError::Invariant(InvariantError::BelowFloor {
                sum: 4096,
                floor: 4100.0
            })
        );
    }

    #[test]
    fn huge_copy_counts_do_not_overflow() {
        let params = MultiSizeParams {
            min_pg_copies_per_pool_per_osd: 1 << 31,
            ..Default::default()
        };
        let pools: Vec<(String, PoolSpec)> = (0..4)
            .map(|i| (format!("p{}", i), PoolSpec::new(0.0, 1)))
            .collect();
        let err = allocate_multi_size(1 << 31, pools, &params).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Configuration(ConfigurationError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn too_many_small_pools() {
        let pools: Vec<(String, PoolSpec)> = (0..200)
            .map(|i| (format!("p{}", i), PoolSpec::new(0.0, 3)))
            .collect();
        let err = allocate_multi_size(2, pools, &MultiSizeParams::default()).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Configuration(ConfigurationError::BudgetExceeded { .. })
        ));
    }

    #[test]
    fn copies_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = MultiSizeParams::default();
        for _ in 0..300 {
            let osd: u32 = rng.gen_range(3..400);
            let specs: Vec<(String, PoolSpec)> = (0..rng.gen_range(1..8))
                .map(|i| {
                    let w = if rng.gen_bool(0.25) { 0.0 } else { rng.gen_range(0.5..20.0) };
                    (format!("pool{}", i), PoolSpec::new(w, rng.gen_range(1..=3)))
                })
                .collect();
            let sizes: BTreeMap<String, u32> =
                specs.iter().map(|(n, p)| (n.clone(), p.size)).collect();
            let any_weighted = specs.iter().any(|(_, p)| p.weight > 0.0);

            let res = allocate_multi_size(osd, specs, &params).unwrap();
            let total = res.total_copies(|name| sizes[name]);
            assert!(total <= osd as u64 * 300, "osd={} total={}", osd, total);
            if any_weighted {
                assert!(total >= osd as u64 * 100, "osd={} total={}", osd, total);
            }
            for (name, pg) in &res.pools {
                assert!(pg.is_power_of_two(), "{}: {}", name, pg);
                let floor = round_pow2(2.0 * osd as f64 / sizes[name] as f64).unwrap();
                assert!(*pg >= floor, "{}: {} < {}", name, pg, floor);
            }
        }
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut specs: Vec<(String, PoolSpec)> = (0..20)
            .map(|i| {
                let w = if i % 4 == 0 { 0.0 } else { rng.gen_range(0.0..5.0) };
                (format!("p{:02}", i), PoolSpec::new(w, rng.gen_range(1..=4)))
            })
            .collect();
        let params = MultiSizeParams::default();
        let expected = allocate_multi_size(64, specs.clone(), &params).unwrap();
        for _ in 0..10 {
            specs.shuffle(&mut rng);
            assert_eq!(allocate_multi_size(64, specs.clone(), &params).unwrap(), expected);
        }
    }
}
