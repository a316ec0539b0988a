//! keygate command line.
//!
//! ```text
//! keygate [--config gates.toml] demo
//! keygate [--config gates.toml] simulate --gate payments --threads 8 --calls 100
//! keygate check-config gates.toml
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::Rng;
use serde_json::json;

use keygate::config::{load_config, GateConfig, KeygateConfig};
use keygate::gate::registry::build_gate;
use keygate::gate::DEFAULT_GATE_NAME;
use keygate::observability::{logging, metrics};
use keygate::{Gate, GateRegistry, KeyGate};

const DEMO_KEY: &str = "demo-key";
const MAX_DEMO_THRESHOLD: i64 = 10_000;

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "Per-key failure gate", long_about = None)]
struct Cli {
    /// TOML file with observability settings and named gates.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trip a gate, wait out the cooldown, and check again
    Demo {
        #[arg(
            long,
            default_value_t = 5,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i64).range(..=MAX_DEMO_THRESHOLD)
        )]
        threshold: i64,

        #[arg(long, default_value_t = 3000)]
        cooldown_ms: u64,
    },
    /// Drive a gate from several threads and print a JSON summary
    Simulate {
        #[arg(short, long, default_value = DEFAULT_GATE_NAME)]
        gate: String,

        #[arg(short, long, default_value_t = 8)]
        threads: usize,

        /// Checks per thread.
        #[arg(long, default_value_t = 100)]
        calls: usize,

        /// Distinct keys to spread checks over.
        #[arg(short, long, default_value_t = 4)]
        keys: usize,

        #[arg(short, long, default_value_t = 1)]
        weight: i64,
    },
    /// Validate a config file and print its gates
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => KeygateConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("keygate v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    match cli.command {
        Commands::Demo {
            threshold,
            cooldown_ms,
        } => run_demo(threshold, Duration::from_millis(cooldown_ms)).await,
        Commands::Simulate {
            gate,
            threads,
            calls,
            keys,
            weight,
        } => {
            let gate = resolve_gate(&config, &gate)?;
            run_simulation(gate, threads, calls, keys, weight).await
        }
        Commands::CheckConfig { path } => {
            let checked = load_config(&path)?;
            tracing::info!(path = %path.display(), gates = checked.gates.len(), "Configuration valid");
            println!("{}", serde_json::to_string_pretty(&checked.gates)?);
            Ok(())
        }
    }
}

async fn run_demo(threshold: i64, cooldown: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let gate = Gate::new(threshold, Duration::from_secs(20), cooldown).named("demo");

    for attempt in 1..=demo_attempts(threshold) {
        let allowed = gate.allow(DEMO_KEY);
        tracing::info!(attempt, allowed, status = gate.status(DEMO_KEY).label(), "Check");
    }

    let wait = cooldown + Duration::from_secs(2);
    tracing::info!(wait_ms = wait.as_millis() as u64, "Waiting for the cooldown to elapse");
    tokio::time::sleep(wait).await;

    let allowed = gate.allow(DEMO_KEY);
    tracing::info!(allowed, status = gate.status(DEMO_KEY).label(), "Check after cooldown");
    Ok(())
}

/// Checks made before the cooldown wait: enough to trip the key and see it rejected.
fn demo_attempts(threshold: i64) -> i64 {
    threshold.clamp(0, MAX_DEMO_THRESHOLD).saturating_add(3)
}

fn total_checks(threads: usize, calls: usize) -> Result<usize, String> {
    threads
        .checked_mul(calls)
        .ok_or_else(|| format!("{} threads x {} calls overflows the check count", threads, calls))
}

fn resolve_gate(config: &KeygateConfig, name: &str) -> Result<Arc<dyn KeyGate>, Box<dyn std::error::Error>> {
    if let Some(gate) = GateRegistry::from_config(config).get(name) {
        return Ok(gate);
    }
    if name == DEFAULT_GATE_NAME {
        return Ok(build_gate(name, &GateConfig::default()));
    }
    Err(format!("unknown gate '{}'", name).into())
}

async fn run_simulation(
    gate: Arc<dyn KeyGate>,
    threads: usize,
    calls: usize,
    keys: usize,
    weight: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = total_checks(threads, calls)?;
    let keys = keys.max(1);
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let gate = gate.clone();
            tokio::task::spawn_blocking(move || {
                let mut rng = rand::thread_rng();
                let mut allowed = 0usize;
                for _ in 0..calls {
                    let key = format!("key-{}", rng.gen_range(0..keys));
                    if gate.allow_n(&key, weight) {
                        allowed += 1;
                    }
                }
                allowed
            })
        })
        .collect();

    let mut allowed = 0;
    for worker in workers {
        allowed += worker.await?;
    }

    let per_key: BTreeMap<String, serde_json::Value> = (0..keys)
        .map(|i| {
            let key = format!("key-{}", i);
            let status = gate.status(&key);
            let summary = json!({ "status": status.label(), "counter": status.counter() });
            (key, summary)
        })
        .collect();

    let summary = json!({
        "gate": gate.name(),
        "threshold": gate.policy().failure_threshold,
        "checks": total,
        "allowed": allowed,
        "rejected": total - allowed,
        "tracked_keys": gate.tracked_keys(),
        "keys": per_key,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
