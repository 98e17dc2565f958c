use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dvroute::config::NetworkConfig;
use dvroute::framework::RoutingSystem;
use dvroute::sim::Simulation;
use log::{info, warn};
use simplelog::*;

struct SimSystem {}
impl RoutingSystem for SimSystem {
    type NodeAddress = String;
    type Link = u32;
}

#[derive(Parser)]
#[command(name = "sim-runner", about = "Runs a distance-vector network on a simulated clock")]
struct Cli {
    /// Path to the network configuration (JSON)
    config: PathBuf,
    /// Simulated time to run for, in milliseconds
    #[arg(short, long, default_value_t = 60_000)]
    duration_ms: u64,
    /// Cut a link during the run, as <link id>@<time in ms>. May be repeated.
    #[arg(long = "cut", value_parser = parse_cut)]
    cuts: Vec<(u32, u64)>,
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn parse_cut(arg: &str) -> Result<(u32, u64), String> {
    let (link, at) = arg
        .split_once('@')
        .ok_or_else(|| format!("expected <link id>@<time in ms>, got {arg}"))?;
    let link = link.parse().map_err(|err| format!("bad link id {link}: {err}"))?;
    let at = at.parse().map_err(|err| format!("bad time {at}: {err}"))?;
    Ok((link, at))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    CombinedLogger::init(vec![TermLogger::new(
        cli.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;

    let config = NetworkConfig::<SimSystem>::load(&cli.config)?;
    info!(
        "Loaded {} nodes and {} links from {}",
        config.nodes.len(),
        config.links.len(),
        cli.config.display()
    );

    let mut sim = Simulation::from_config(&config)?;
    sim.start();

    let mut cuts = cli.cuts.clone();
    cuts.sort_by_key(|(_, at)| *at);
    for (link, at) in cuts {
        if at > cli.duration_ms {
            warn!("Link {link} would be cut at {at} ms, after the run ends");
            continue;
        }
        sim.run_until(Duration::from_millis(at));
        info!("Cutting link {link} at {at} ms");
        sim.cut_link(&link);
    }
    sim.run_until(Duration::from_millis(cli.duration_ms));

    for (node, table) in sim.shutdown() {
        println!("@{node}: Routing table:\n{table}");
    }
    for router in sim.routers.values() {
        for msg in &router.delivered {
            println!("@{}: got message {} from {}", router.address, msg.id, msg.source);
        }
    }
    Ok(())
}
