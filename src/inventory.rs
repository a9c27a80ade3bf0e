//! Cluster inventory: OSD hosts, pool definitions and tuning knobs.
//!
//! The inventory is a JSON document. Every tuning key is optional.
//!
//! ```json
//! {
//!   "osds": [{"host": "node-1", "devices": ["/dev/sdb", "/dev/sdc"]}],
//!   "pool_default_size": 3,
//!   "pools": {"rbd": 4, "images": 0}
//! }
//! ```
//!
//! `pools` either maps names to a weight (every pool uses
//! `pool_default_size`) or to a `[weight, size]` pair.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::cluster::ClusterMap;
use crate::error::InventoryError;

/// One OSD node and its data devices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsdHost {
    pub host: String,
    #[serde(default)]
    pub devices: Vec<String>,
    /// Devices that exist but should not receive PGs.
    #[serde(default)]
    pub out: Vec<String>,
}

/// Pool definitions. The shape of the table selects the allocator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PoolTable {
    /// `{name: weight}`, all pools share `pool_default_size`.
    Weighted(BTreeMap<String, f64>),
    /// `{name: [weight, size]}`.
    Sized(BTreeMap<String, (f64, u32)>),
}

impl Default for PoolTable {
    fn default() -> Self {
        PoolTable::Weighted(BTreeMap::new())
    }
}

impl PoolTable {
    pub fn len(&self) -> usize {
        match self {
            PoolTable::Weighted(p) => p.len(),
            PoolTable::Sized(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Inventory {
    pub osds: Vec<OsdHost>,
    #[serde(default = "default_pool_size")]
    pub pool_default_size: u32,
    #[serde(default)]
    pub pools: PoolTable,
    #[serde(default = "default_pg_per_osd")]
    pub pg_per_osd: u32,
    #[serde(default = "default_min_pg_per_pool_per_osd")]
    pub min_pg_per_pool_per_osd: u32,
    #[serde(default = "default_min_pgc_per_osd")]
    pub min_pgc_per_osd: u32,
    #[serde(default = "default_max_pgc_per_osd")]
    pub max_pgc_per_osd: u32,
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

fn default_pool_size() -> u32 {
    3
}

fn default_pg_per_osd() -> u32 {
    200
}

fn default_min_pg_per_pool_per_osd() -> u32 {
    2
}

fn default_min_pgc_per_osd() -> u32 {
    100
}

fn default_max_pgc_per_osd() -> u32 {
    300
}

fn default_cluster() -> String {
    "ceph".to_string()
}

impl Inventory {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        debug!("loading inventory from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, InventoryError> {
        let inv: Inventory = serde_json::from_str(text)?;
        if inv.osds.is_empty() {
            return Err(InventoryError::NoOsdHosts);
        }
        Ok(inv)
    }

    /// Build the cluster map from the OSD hosts.
    pub fn cluster_map(&self) -> Result<ClusterMap, InventoryError> {
        let mut map = ClusterMap::default();
        for host in &self.osds {
            if host.devices.is_empty() {
                warn!("osd host {} has no devices", host.host);
            }
            for dev in &host.devices {
                map.add_device(&host.host, dev);
            }
            for dev in &host.out {
                map.set_device_inout(&host.host, dev, true)
                    .ok_or_else(|| InventoryError::UnknownOutDevice {
                        host: host.host.clone(),
                        device: dev.clone(),
                    })?;
            }
        }
        Ok(map)
    }
}
