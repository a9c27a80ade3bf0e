//! Rendering of a [`PoolPlan`] for provisioning.

use std::fmt::Write;

use crate::error::InventoryError;
use crate::plan::PoolPlan;

/// Escape `name` for use inside a YAML double-quoted scalar.
pub fn sanitize_name(name: &str) -> String {
    let mut res = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '\\' => res.push_str("\\\\"),
            '"' => res.push_str("\\\""),
            c if c.is_control() => {}
            c => res.push(c),
        }
    }
    res
}

/// Ansible playbook creating every pool of `plan` that does not exist yet.
pub fn render_playbook(plan: &PoolPlan) -> String {
    let mut pools = String::new();
    for (name, pg_num) in &plan.allocation.pools {
        // writing into a String cannot fail
        let _ = writeln!(
            pools,
            "    - {{name: \"{}\", pg_num: {}}}",
            sanitize_name(name),
            pg_num
        );
    }
    let items = if pools.is_empty() {
        " []\n".to_string()
    } else {
        format!("\n{}", pools)
    };

    format!(
        r#"---

- hosts: mons[0]
  gather_facts: False
  vars:
    cluster: "{cluster}"
  tasks:
  - name: check pools exists
    shell: ceph --cluster {{{{ cluster }}}} osd pool get {{{{ item.name }}}} pg_num
    register: pool_exists
    ignore_errors: True
    with_items:{items}  - name: create pools
    shell: ceph --cluster {{{{ cluster }}}} osd pool create {{{{ item.item.name }}}} {{{{ item.item.pg_num }}}}
    with_items: '{{{{ pool_exists.results }}}}'
    when: item.rc != 0
"#,
        cluster = sanitize_name(&plan.cluster),
        items = items,
    )
}

/// Flat `{pool: pg_num}` map, including `default_pg_num`, as pretty JSON.
pub fn render_json(plan: &PoolPlan) -> Result<String, InventoryError> {
    Ok(serde_json::to_string_pretty(&plan.allocation.to_map())?)
}
