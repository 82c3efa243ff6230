//! lobsim — limit order book market simulator
//!
//! Subcommands:
//! - `stream`  — run generator ticks, write L3 events to stdout as JSON lines
//! - `profile` — run ticks silently, report throughput on stderr
//! - `ws`      — serve the snapshot broadcaster
//!
//! Exit codes: 0 success, 1 invalid arguments, 2 runtime fault.

use std::io::Write;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use market_data::{feed_app, BroadcastConfig};
use simulation::{MarketGenerator, SimulationConfig};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "lobsim", about = "Limit order book market simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Generator options shared by every subcommand.
#[derive(Args)]
struct SimArgs {
    /// RNG seed; identical seeds reproduce identical runs. Random when
    /// omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Price quantum
    #[arg(long, default_value_t = 0.01)]
    tick_size: f64,

    /// Base arrival budget per tick
    #[arg(long, default_value_t = 5)]
    orders_per_tick: u32,

    /// Fraction of noise intents that are cancels, in [0, 1]
    #[arg(long, default_value_t = 0.2)]
    cancel_ratio: f64,

    /// Intraday curve period in seconds
    #[arg(long, default_value_t = 23_400)]
    session_length_s: u32,

    /// Run full book invariant checks after every mutation
    #[arg(long)]
    validate_orders: bool,
}

impl SimArgs {
    fn to_config(&self) -> SimulationConfig {
        let seed = self.seed.unwrap_or_else(rand::random);
        if self.seed.is_none() {
            info!(seed, "no seed given; using a random one");
        }
        SimulationConfig {
            seed,
            tick_size: self.tick_size,
            orders_per_tick: self.orders_per_tick,
            cancel_ratio: self.cancel_ratio.clamp(0.0, 1.0),
            session_length_s: self.session_length_s,
            validate_orders: self.validate_orders,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the generator and write L3 events to stdout
    Stream {
        /// Number of generator ticks to run
        #[arg(long, default_value_t = 20)]
        steps: u64,

        /// Sleep between ticks, in seconds
        #[arg(long, default_value_t = 0.0)]
        sleep_sec: f64,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Run ticks silently and report throughput on stderr
    Profile {
        #[arg(long, default_value_t = 2000)]
        steps: u64,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Serve order book snapshots over WebSocket
    Ws {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8765)]
        port: u16,

        /// Snapshot frame rate
        #[arg(long, default_value_t = 30)]
        target_hz: u16,

        /// Depth cap per snapshot side
        #[arg(long, default_value_t = 50)]
        depth: u16,

        /// Connections beyond this cap are rejected at handshake
        #[arg(long, default_value_t = 64)]
        max_subscribers: u16,

        #[command(flatten)]
        sim: SimArgs,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let result = match cli.command {
        Commands::Stream { steps, sleep_sec, sim } => run_stream(steps, sleep_sec, &sim),
        Commands::Profile { steps, sim } => run_profile(steps, &sim),
        Commands::Ws {
            host,
            port,
            target_hz,
            depth,
            max_subscribers,
            sim,
        } => run_ws(&host, port, target_hz, depth, max_subscribers, &sim),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run_stream(steps: u64, sleep_sec: f64, sim: &SimArgs) -> anyhow::Result<()> {
    let mut generator = MarketGenerator::with_standard_agents(sim.to_config());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for _ in 0..steps {
        for record in generator.step() {
            let line = serde_json::to_string(&record).context("serialize event")?;
            writeln!(out, "{line}").context("write event")?;
        }
        if sleep_sec > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(sleep_sec));
        }
    }
    Ok(())
}

fn run_profile(steps: u64, sim: &SimArgs) -> anyhow::Result<()> {
    let mut generator = MarketGenerator::with_standard_agents(sim.to_config());

    let started = Instant::now();
    let mut events: u64 = 0;
    let mut trades: u64 = 0;
    for _ in 0..steps {
        for record in generator.step() {
            events += 1;
            trades += record.trades.len() as u64;
        }
    }
    let elapsed = started.elapsed();

    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    eprintln!("ticks:        {steps}");
    eprintln!("events:       {events}");
    eprintln!("trades:       {trades}");
    eprintln!("resting:      {}", generator.book().resting_orders());
    eprintln!("elapsed:      {elapsed:.2?}");
    eprintln!("ticks/sec:    {:.0}", steps as f64 / secs);
    eprintln!("events/sec:   {:.0}", events as f64 / secs);
    Ok(())
}

fn run_ws(
    host: &str,
    port: u16,
    target_hz: u16,
    depth: u16,
    max_subscribers: u16,
    sim: &SimArgs,
) -> anyhow::Result<()> {
    let generator = MarketGenerator::with_standard_agents(sim.to_config());
    let config = BroadcastConfig {
        target_hz,
        depth,
        max_subscribers,
        ..Default::default()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build runtime")?;

    runtime.block_on(async move {
        let (router, handle) = feed_app(generator, config);

        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("bind {host}:{port}"))?;
        info!("listening on {}", listener.local_addr().context("local addr")?);

        let trigger = handle.trigger();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
                let _ = trigger.send(true);
            })
            .await
            .context("serve")?;

        handle.shutdown().await;
        Ok(())
    })
}
