use std::collections::BTreeMap;

/// The cluster map: which hosts carry which OSDs.
#[derive(Debug, Default, Clone)]
pub struct ClusterMap {
    root: Node,
}

/// A node in cluster map.
///
/// Either root / host / device.
#[derive(Debug, Default, Clone)]
struct Node {
    out: bool,
    children: BTreeMap<String, Node>,
}

impl ClusterMap {
    /// Add `device` under `host`. The device name is taken as is, slashes
    /// included.
    pub fn add_device(&mut self, host: &str, device: &str) {
        self.root
            .children
            .entry(host.into())
            .or_default()
            .children
            .entry(device.into())
            .or_default();
    }

    /// Mark a device IN/OUT. Returns `None` when host or device is unknown.
    pub fn set_device_inout(&mut self, host: &str, device: &str, out: bool) -> Option<()> {
        let dev = self.root.children.get_mut(host)?.children.get_mut(device)?;
        dev.out = out;
        Some(())
    }

    /// Number of devices that are in.
    pub fn osd_count(&self) -> u32 {
        if self.root.children.is_empty() {
            return 0;
        }
        self.root.count_in()
    }

    /// Host names, in order.
    pub fn hosts(&self) -> Vec<&str> {
        self.root.children.keys().map(String::as_str).collect()
    }
}

impl Node {
    fn count_in(&self) -> u32 {
        if self.out {
            return 0;
        }
        if self.children.is_empty() {
            return 1;
        }
        self.children.values().map(Node::count_in).sum()
    }
}
