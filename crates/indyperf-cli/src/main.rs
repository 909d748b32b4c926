//! indyperf - distributed build-cycle load harness
//!
//! Every builder process gets the same suite plus its own index; each
//! computes its share of the builds and runs them against the repository.
//!
//! ## Commands
//!
//! - `run`: execute this builder's share and print the result tally
//! - `plan`: print this builder's execution order without running it
//! - `check-config`: validate the suite, environment and SSO files

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use indy_client::{IndyClient, RunContext};
use indyperf_core::config::{self, Suite};
use indyperf_core::planner::{plan_builds, WorkerSlot};
use indyperf_core::telemetry::{init_tracing, level_for_verbosity};
use indyperf_core::{ConfigError, PlanError};
use indyperf_pipeline::{BuildPipeline, RunCoordinator, ShellRunner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Exit code for configuration and worker identity errors.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "indyperf")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Distributed build-cycle load harness for the Indy repository service", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Suite definition (builds, stores, promotion mode)
    #[arg(env = "SUITE_YML")]
    suite_yml: PathBuf,

    /// Environment definition (service URLs, proxy, promotion target)
    #[arg(short = 'E', long = "env-yml", env = "ENV_YML", default_value = "/target/env.yml")]
    env_yml: PathBuf,

    /// SSO definition; overrides the environment's `sso` section
    #[arg(short = 'S', long = "sso-yml", env = "SSO_YML")]
    sso_yml: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Suite, ConfigError> {
        config::load(&self.suite_yml, &self.env_yml, self.sso_yml.as_deref())
    }

    /// Load the suite and resolve the worker slot, reporting problems with
    /// both in one listing.
    fn load_for_worker(&self, worker: &WorkerArgs) -> Result<(Suite, WorkerSlot), ConfigError> {
        let slot = worker.slot();
        let problems = slot.as_ref().err().map(ToString::to_string).into_iter().collect();
        let suite = config::load_with_problems(&self.suite_yml, &self.env_yml, self.sso_yml.as_deref(), problems)?;
        let slot = slot.map_err(|e| ConfigError::Invalid(vec![e.to_string()]))?;
        Ok((suite, slot))
    }
}

fn log_warnings(suite: &Suite) {
    for warning in suite.env.warnings() {
        warn!("{}", warning);
    }
}

#[derive(Args, Debug, Clone)]
struct WorkerArgs {
    /// Zero-based index of this builder
    #[arg(value_name = "BUILDER_IDX", env = "BUILDER_INDEX")]
    builder_idx: Option<usize>,

    /// Number of builders sharing the suite
    #[arg(value_name = "TOTAL_BUILDERS", env = "BUILDERS")]
    total_builders: Option<usize>,

    /// Derive the builder index from this name's numeric suffix (builder-3 is 3)
    #[arg(long, env = "NODENAME")]
    node_name: Option<String>,
}

impl WorkerArgs {
    fn slot(&self) -> Result<WorkerSlot, PlanError> {
        let count = self
            .total_builders
            .ok_or(PlanError::MissingWorkerIdentity("builder count (TOTAL_BUILDERS or BUILDERS)"))?;

        let index = match (self.builder_idx, self.node_name.as_deref()) {
            (Some(index), _) => index,
            (None, Some(node_name)) => WorkerSlot::index_from_node_name(node_name)?,
            (None, None) => {
                return Err(PlanError::MissingWorkerIdentity(
                    "builder index (BUILDER_IDX, BUILDER_INDEX or --node-name)",
                ))
            }
        };

        WorkerSlot::new(index, count)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run this builder's share of the suite
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        worker: WorkerArgs,

        /// Directory receiving one checkout per execution
        #[arg(short = 'B', long, env = "BUILDS_DIR", default_value = ".")]
        builds_dir: PathBuf,

        /// Write the tally and every outcome to this file as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Keep the process alive after the run until interrupted
        #[arg(long)]
        hold: bool,
    },

    /// Print this builder's planned execution order
    Plan {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        worker: WorkerArgs,
    },

    /// Validate the configuration files and print the resolved settings
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Run {
            config,
            worker,
            builds_dir,
            report,
            hold,
        } => cmd_run(&config, &worker, &builds_dir, report.as_deref(), hold).await,
        Commands::Plan { config, worker } => cmd_plan(&config, &worker).map(|_| true),
        Commands::CheckConfig { config } => cmd_check_config(&config).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<PlanError>().is_some() {
        EXIT_CONFIG
    } else {
        1
    }
}

/// Returns whether every execution succeeded.
async fn cmd_run(
    config: &ConfigArgs,
    worker: &WorkerArgs,
    builds_dir: &Path,
    report_path: Option<&Path>,
    hold: bool,
) -> Result<bool> {
    let (suite, slot) = config.load_for_worker(worker)?;
    log_warnings(&suite);

    let context = RunContext::authenticate(&suite.env.indy_url, Some(&suite.sso), suite.env.ssl_verify)
        .await
        .context("Failed to authenticate against SSO")?;
    let client = IndyClient::new(&context).context("Failed to create repository client")?;

    info!(
        indy = %suite.env.indy_url,
        builder = slot.index,
        builders = slot.count,
        "Starting run"
    );

    let pipeline = BuildPipeline::new(Arc::new(client), Arc::new(ShellRunner), context, builds_dir);
    let report = RunCoordinator::new(pipeline)
        .run(&suite, slot.index, slot.count)
        .await?;

    println!();
    print!("{}", report.tally.render_table());

    if let Some(path) = report_path {
        report.write_json(path)?;
        info!(path = ?path, "Wrote run report");
    }

    if hold {
        info!("Run finished; holding until interrupted");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to wait for interrupt")?;
    }

    Ok(report.success())
}

fn cmd_plan(config: &ConfigArgs, worker: &WorkerArgs) -> Result<()> {
    let (suite, slot) = config.load_for_worker(worker)?;
    let order = plan_builds(&suite.builds, slot);

    println!(
        "Builder {} of {}: {} execution(s)",
        slot.index,
        slot.count,
        order.len()
    );
    for (position, entry) in order.iter().enumerate() {
        println!("{:>4}  {} (pass {})", position + 1, entry.build_name, entry.pass_index + 1);
    }
    Ok(())
}

#[derive(Serialize)]
struct BuildSummary<'a> {
    name: &'a str,
    git_url: &'a str,
    git_branch: &'a str,
    times: usize,
}

#[derive(Serialize)]
struct ConfigSummary<'a> {
    indy_url: &'a str,
    da_url: Option<&'a str>,
    sso_enabled: bool,
    proxy_enabled: bool,
    ssl_verify: bool,
    do_promote: bool,
    promote_by_path: bool,
    mvn_goals: &'a str,
    pause_secs: u64,
    stores: Vec<String>,
    builds: Vec<BuildSummary<'a>>,
    warnings: Vec<String>,
}

impl<'a> ConfigSummary<'a> {
    fn of(suite: &'a Suite) -> Self {
        ConfigSummary {
            indy_url: &suite.env.indy_url,
            da_url: suite.env.da_url.as_deref(),
            sso_enabled: suite.sso.enabled,
            proxy_enabled: suite.env.proxy_enabled,
            ssl_verify: suite.env.ssl_verify,
            do_promote: suite.env.do_promote,
            promote_by_path: suite.promote_by_path,
            mvn_goals: &suite.env.mvn_goals,
            pause_secs: suite.pause.as_secs(),
            stores: suite.stores.iter().map(|s| s.key.to_string()).collect(),
            builds: suite
                .builds
                .iter()
                .map(|b| BuildSummary {
                    name: &b.name,
                    git_url: &b.git_url,
                    git_branch: &b.git_branch,
                    times: b.repeat_count(),
                })
                .collect(),
            warnings: suite.env.warnings(),
        }
    }
}

fn cmd_check_config(config: &ConfigArgs) -> Result<()> {
    let suite = config.load()?;
    log_warnings(&suite);
    println!("{}", serde_json::to_string_pretty(&ConfigSummary::of(&suite))?);
    info!(builds = suite.builds.len(), "Configuration is valid");
    Ok(())
}
