// Weekly GM assistant entry point.
//
// Startup sequence:
// 1. Parse CLI
// 2. Initialize tracing (stderr, so stdout stays pure JSON)
// 3. Load config
// 4. Build the pipeline
// 5. Run the subcommand (print JSON, optionally save the artifact) or serve

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use gm_assistant::analysis::RatioMode;
use gm_assistant::config;
use gm_assistant::pipeline::{Pipeline, WaiverRequest};
use gm_assistant::service::{self, ServiceContext};
use gm_assistant::snapshot::store::ReportKind;

#[derive(Parser)]
#[command(name = "gm")]
#[command(about = "Weekly fantasy baseball GM assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw roster + scoreboard JSON into a saved weekly snapshot
    BuildSnapshot {
        #[arg(long)]
        week: u32,

        /// Roster JSON pulled from the fantasy API
        #[arg(long)]
        roster: PathBuf,

        /// Scoreboard JSON for the same week
        #[arg(long)]
        scoreboard: PathBuf,

        /// Stat-id map to embed in the snapshot
        #[arg(long)]
        stat_map: Option<PathBuf>,
    },

    /// Print a saved snapshot
    Snapshot {
        /// Week (defaults to the latest saved snapshot)
        #[arg(long)]
        week: Option<u32>,
    },

    /// Category pressure against this week's opponent
    Pressure(ReportArgs),

    /// Roster inefficiency scan
    Inefficiency(ReportArgs),

    /// Score a waiver pool against current roster needs
    RankPool {
        #[command(flatten)]
        report: ReportArgs,

        /// Pool file (.json or .csv); defaults to waivers.default_pool
        #[arg(long)]
        pool: Option<PathBuf>,

        /// How many candidates to keep; defaults to waivers.rank_top
        #[arg(long)]
        top: Option<usize>,
    },

    /// Waiver add/drop/bench suggestions
    Waivers {
        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        pools: PoolArgs,
    },

    /// Pressure, inefficiency and waivers in one document
    Report {
        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        pools: PoolArgs,
    },

    /// Serve reports over HTTP
    Serve,
}

#[derive(Args)]
struct ReportArgs {
    /// Week (defaults to the latest saved snapshot)
    #[arg(long)]
    week: Option<u32>,

    /// Also write the report under the data directory
    #[arg(long, default_value = "false")]
    save: bool,
}

#[derive(Args)]
struct PoolArgs {
    /// General waiver pool (.json or .csv)
    #[arg(long)]
    pool: Option<PathBuf>,

    /// Relief pitcher pool used to gauge the saves market
    #[arg(long)]
    sv_pool: Option<PathBuf>,

    /// protect | push
    #[arg(long)]
    ratio_mode: Option<RatioMode>,
}

impl From<PoolArgs> for WaiverRequest {
    fn from(args: PoolArgs) -> Self {
        WaiverRequest {
            pool: args.pool,
            sv_pool: args.sv_pool,
            ratio_mode: args.ratio_mode,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), team={}",
        config.league.name, config.league.league_key, config.league.team_key
    );

    let pipeline = Pipeline::from_config(&config);

    match cli.command {
        Commands::BuildSnapshot {
            week,
            roster,
            scoreboard,
            stat_map,
        } => {
            let snapshot = pipeline
                .build_snapshot(week, &roster, &scoreboard, stat_map.as_deref())
                .context("failed to build snapshot")?;
            print_json(&snapshot)?;
        }

        Commands::Snapshot { week } => {
            let week = pipeline.resolve_week(week)?;
            let snapshot = pipeline
                .snapshot(week)
                .with_context(|| format!("failed to load week {week} snapshot"))?;
            print_json(&snapshot)?;
        }

        Commands::Pressure(args) => {
            let week = pipeline.resolve_week(args.week)?;
            let report = pipeline.pressure(week).context("pressure report failed")?;
            emit(&pipeline, ReportKind::Pressure, week, &report, args.save)?;
        }

        Commands::Inefficiency(args) => {
            let week = pipeline.resolve_week(args.week)?;
            let report = pipeline
                .inefficiency(week)
                .context("inefficiency report failed")?;
            emit(&pipeline, ReportKind::Inefficiency, week, &report, args.save)?;
        }

        Commands::RankPool { report, pool, top } => {
            let week = pipeline.resolve_week(report.week)?;
            let ranked = pipeline
                .rank_pool(week, pool.as_deref(), top)
                .context("pool ranking failed")?;
            emit(&pipeline, ReportKind::RankedPool, week, &ranked, report.save)?;
        }

        Commands::Waivers { report, pools } => {
            let week = pipeline.resolve_week(report.week)?;
            let waivers = pipeline
                .waivers(week, &pools.into())
                .context("waiver report failed")?;
            emit(&pipeline, ReportKind::Waivers, week, &waivers, report.save)?;
        }

        Commands::Report { report, pools } => {
            let weekly = pipeline
                .weekly_report(report.week, &pools.into())
                .context("weekly report failed")?;
            if report.save {
                pipeline.save_weekly(&weekly)?;
            }
            print_json(&weekly)?;
        }

        Commands::Serve => {
            let ctx = ServiceContext {
                pipeline,
                api_key: config.api_key().map(str::to_string),
            };
            service::run(&config.service.host, config.service.port, ctx)
                .await
                .context("HTTP service failed")?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(
    pipeline: &Pipeline,
    kind: ReportKind,
    week: u32,
    report: &T,
    save: bool,
) -> anyhow::Result<()> {
    if save {
        pipeline.save_report(kind, week, report)?;
    }
    print_json(report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode JSON output")?;
    println!("{text}");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gm_assistant=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
