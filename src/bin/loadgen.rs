//! Load generator for the stampede cache server
//!
//! Runs one workload scenario against `/item` and prints per-phase request
//! counts and latency quantiles, plus how many requests reached the backend.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stampede_cache::loadgen::{run_phase, KeyPattern, LoadClient, Phase, PhaseReport};
use stampede_cache::Mode;

/// Command line interface parser.
#[derive(Parser)]
#[command(name = "loadgen", about = "Drives /item on a running stampede_cache server")]
struct Cli {
    /// Base URL of the server
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Switch the server to this mode (M0..M5) before the run
    #[arg(long)]
    mode: Option<Mode>,

    /// Cache capacity applied with --mode
    #[arg(long, default_value_t = 10_000)]
    capacity: usize,

    /// Entry TTL in milliseconds applied with --mode
    #[arg(long, default_value_t = 60_000)]
    ttl: u64,

    /// Backend latency in milliseconds applied with --mode
    #[arg(long, default_value_t = 500)]
    latency: u64,

    /// Reset the backend counter and clear the cache before the run
    #[arg(long)]
    reset: bool,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand)]
enum Scenario {
    /// Zipf-ranked keys, optionally diluted by one-off scan keys
    Zipf {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(long, default_value_t = 1_000_000)]
        universe: u64,
        #[arg(long, default_value_t = 0.9)]
        alpha: f64,
        #[arg(long, default_value_t = 0.0)]
        scan_ratio: f64,
    },
    /// Every worker reads one key, so each TTL expiry is a stampede
    Herd {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(long, default_value = "hot-key-stampede")]
        key: String,
    },
    /// Hot keys take most of the traffic, cold keys the rest
    HotCold {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        keys: HotColdArgs,
    },
    /// Hot keys mixed with unique scan keys, for comparing LRU and SIEVE
    Scan {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(long, default_value_t = 200)]
        hot_keys: u64,
        #[arg(long, default_value_t = 0.1)]
        scan_ratio: f64,
    },
    /// Hot/cold traffic over consecutive phases of varying concurrency
    Phases {
        #[command(flatten)]
        keys: HotColdArgs,
        /// Phase durations in seconds
        #[arg(long, value_delimiter = ',', default_value = "60,120,60,120")]
        durations: Vec<u64>,
        /// Concurrent requests per phase
        #[arg(long, value_delimiter = ',', default_value = "50,200,500,200")]
        concurrency: Vec<usize>,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// Duration in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,
    /// Concurrent requests
    #[arg(long, default_value_t = 50)]
    concurrency: usize,
}

impl LoadArgs {
    fn phase(&self) -> Phase {
        Phase::new(self.concurrency, Duration::from_secs(self.duration))
    }
}

#[derive(Args)]
struct HotColdArgs {
    #[arg(long, default_value_t = 100_000)]
    total_keys: u64,
    #[arg(long, default_value_t = 1_000)]
    hot_keys: u64,
    #[arg(long, default_value_t = 0.8)]
    hot_ratio: f64,
}

impl HotColdArgs {
    fn pattern(&self) -> stampede_cache::Result<KeyPattern> {
        KeyPattern::hot_cold(self.total_keys, self.hot_keys, self.hot_ratio)
    }
}

impl Scenario {
    fn name(&self) -> &'static str {
        match self {
            Scenario::Zipf { .. } => "zipf",
            Scenario::Herd { .. } => "herd",
            Scenario::HotCold { .. } => "hot-cold",
            Scenario::Scan { .. } => "scan",
            Scenario::Phases { .. } => "phases",
        }
    }

    fn plan(&self) -> anyhow::Result<(KeyPattern, Vec<Phase>)> {
        let plan = match self {
            Scenario::Zipf {
                load,
                universe,
                alpha,
                scan_ratio,
            } => (
                KeyPattern::zipf(*universe, *alpha, *scan_ratio)?,
                vec![load.phase()],
            ),
            Scenario::Herd { load, key } => (KeyPattern::single(key.clone()), vec![load.phase()]),
            Scenario::HotCold { load, keys } => (keys.pattern()?, vec![load.phase()]),
            Scenario::Scan {
                load,
                hot_keys,
                scan_ratio,
            } => (
                KeyPattern::scan_mix(*hot_keys, *scan_ratio)?,
                vec![load.phase()],
            ),
            Scenario::Phases {
                keys,
                durations,
                concurrency,
            } => {
                if durations.len() != concurrency.len() {
                    anyhow::bail!(
                        "got {} phase durations but {} concurrency levels",
                        durations.len(),
                        concurrency.len()
                    );
                }
                let phases = durations
                    .iter()
                    .zip(concurrency)
                    .map(|(&secs, &workers)| Phase::new(workers, Duration::from_secs(secs)))
                    .collect();
                (keys.pattern()?, phases)
            }
        };
        Ok(plan)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadgen=info,stampede_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = Arc::new(LoadClient::new(cli.url.as_str())?);

    if let Some(mode) = cli.mode {
        let message = client
            .configure(mode, cli.capacity, cli.ttl, cli.latency)
            .await?;
        info!("{}", message);
    }
    if cli.reset {
        client.reset().await?;
        info!("Server counters reset");
    }

    let (pattern, phases) = cli.scenario.plan()?;
    let pattern = Arc::new(pattern);
    println!(
        "=== Scenario {} against {} ({} phase(s)) ===",
        cli.scenario.name(),
        client.base_url(),
        phases.len()
    );

    let backend_before = client.backend_requests().await?;
    let mut overall: Option<PhaseReport> = None;

    for (i, phase) in phases.into_iter().enumerate() {
        println!(
            "--- Phase {}: duration={:?}, concurrency={} ---",
            i + 1,
            phase.duration,
            phase.concurrency
        );
        let report = run_phase(Arc::clone(&client), Arc::clone(&pattern), phase).await;
        println!("Phase {} results: {}", i + 1, report);

        overall = Some(match overall.take() {
            Some(mut total) => {
                total.merge(&report);
                total
            }
            None => report,
        });
    }

    if let Some(total) = overall {
        println!("=== Overall: {} ===", total);
    }

    let backend_after = client.backend_requests().await?;
    println!(
        "Backend requests during run: {}",
        backend_after.saturating_sub(backend_before)
    );

    Ok(())
}
