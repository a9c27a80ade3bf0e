use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

use pg_planner::inventory::Inventory;
use pg_planner::plan::{plan, PlanOverrides};
use pg_planner::playbook::{render_json, render_playbook};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Ansible playbook creating the pools.
    Playbook,
    /// Flat {pool: pg_num} map.
    Json,
}

/// pg-planner: size the placement groups of storage pools
///
/// Reads the OSD hosts and pool definitions from a JSON inventory and prints
/// the PG count of every pool.
#[derive(Debug, Parser)]
struct Opts {
    /// Target PG per OSD value. Real PG per OSD would almost always be
    /// bigger, up to two times. Overrides the inventory setting.
    #[clap(long)]
    pg_per_osd: Option<u32>,

    /// Output format.
    #[clap(long, value_enum, default_value = "playbook")]
    format: Format,

    /// Specify the logging level. Accepts rust's envfilter syntax for modular
    /// logging: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#example-syntax. Examples: ["info", "warn,pg_planner=debug"]
    #[clap(long, default_value = "info")]
    log_level: String,

    /// Path to inventory file.
    inventory: PathBuf,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| match EnvFilter::try_new(&opts.log_level) {
            Ok(filter) => Ok(filter),
            Err(e) => {
                eprintln!(
                    "invalid log envvar: {}, using info, err is: {}",
                    opts.log_level, e
                );
                EnvFilter::try_new("info")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the rendered output, logs go to stderr
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
    {
        eprintln!("failed to init logger: {}", e);
    }

    debug!("opts={:?}", &opts);

    let inv = Inventory::from_path(&opts.inventory)
        .with_context(|| format!("Failed to load inventory {}", opts.inventory.display()))?;
    let overrides = PlanOverrides {
        pg_per_osd: opts.pg_per_osd,
    };
    let plan = plan(&inv, &overrides).context("Failed to compute pool PG counts")?;

    let out = match opts.format {
        Format::Playbook => render_playbook(&plan),
        Format::Json => render_json(&plan).context("Failed to render JSON")?,
    };
    print!("{}", out);
    info!(
        "{} pools planned for {} osds ({:?})",
        plan.allocation.pools.len(),
        plan.osd_count,
        plan.mode
    );
    Ok(())
}
