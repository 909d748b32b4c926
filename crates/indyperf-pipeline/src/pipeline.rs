//! One build execution, from checkout to cleanup.

use crate::namespace::BuildNamespace;
use crate::promotion::{promote_build, OutputPromotion};
use crate::runner::{CommandOutput, CommandRunner, ShellCommand};
use crate::stage;
use crate::workspace::BuildWorkspace;
use anyhow::{anyhow, Context};
use chrono::Local;
use indy_client::{IndyError, RepositoryApi, RunContext};
use indyperf_core::config::{BuildDefinition, Suite};
use indyperf_core::outcome::{BuildOutcome, OutcomeStatus, Stage};
use indyperf_core::settings::SettingsDocument;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Why a stage stopped the execution.
#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    status: OutcomeStatus,
    error: anyhow::Error,
}

impl StageFailure {
    fn build_failure(stage: Stage, error: anyhow::Error) -> Self {
        StageFailure {
            stage,
            status: OutcomeStatus::BuildFailure,
            error,
        }
    }

    fn exception(stage: Stage, error: anyhow::Error) -> Self {
        StageFailure {
            stage,
            status: OutcomeStatus::Exception,
            error,
        }
    }

    /// Service-reported rejections are build failures; transport and
    /// decoding errors are exceptions.
    fn from_repository(stage: Stage, error: IndyError) -> Self {
        let status = if error.is_rejection() {
            OutcomeStatus::BuildFailure
        } else {
            OutcomeStatus::Exception
        };
        StageFailure {
            stage,
            status,
            error: anyhow::Error::new(error).context(format!("{} failed", stage)),
        }
    }
}

type StageResult = Result<(), StageFailure>;

/// Runs single builds end to end.
///
/// Stages run in order, each gated on the previous one. Whatever happens,
/// the build's namespace is released before the outcome is returned.
pub struct BuildPipeline {
    repo: Arc<dyn RepositoryApi>,
    runner: Arc<dyn CommandRunner>,
    context: RunContext,
    builds_dir: PathBuf,
}

impl BuildPipeline {
    pub fn new(
        repo: Arc<dyn RepositoryApi>,
        runner: Arc<dyn CommandRunner>,
        context: RunContext,
        builds_dir: impl Into<PathBuf>,
    ) -> Self {
        BuildPipeline {
            repo,
            runner,
            context,
            builds_dir: builds_dir.into(),
        }
    }

    /// Execute `build` once and report how it went. Never fails.
    pub async fn execute(&self, build_name: &str, build: &BuildDefinition, suite: &Suite) -> BuildOutcome {
        let start = Instant::now();
        info!(build = %build_name, "Starting build");

        let workspace = match BuildWorkspace::allocate(&self.builds_dir, build_name, Local::now()) {
            Ok(workspace) => workspace,
            Err(e) => {
                error!(build = %build_name, "Cannot create build directory: {}", e);
                let mut outcome = BuildOutcome::failure(
                    build_name,
                    None,
                    OutcomeStatus::Exception,
                    Stage::Provision,
                    format!("cannot create build directory under {}: {}", self.builds_dir.display(), e),
                );
                outcome.duration_ms = start.elapsed().as_millis() as u64;
                return outcome;
            }
        };
        let tid = workspace.tid.clone();

        let mut namespace = BuildNamespace::allocate(self.repo.clone(), &suite.env, &tid);
        let result = self.run_stages(build, suite, &workspace, &mut namespace).await;
        let cleanup = namespace.release().await;

        let mut outcome = match result {
            Ok(()) => {
                info!(build = %build_name, tid = %tid, "Build succeeded");
                BuildOutcome::success(build_name, &tid)
            }
            Err(failure) => {
                let message = format!("{:#}", failure.error);
                error!(
                    build = %build_name,
                    tid = %tid,
                    stage = %failure.stage,
                    status = %failure.status,
                    "Build failed: {}",
                    message
                );
                BuildOutcome::failure(build_name, Some(&tid), failure.status, failure.stage, message)
            }
        };

        outcome.cleanup = cleanup;
        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome
    }

    async fn run_stages(
        &self,
        build: &BuildDefinition,
        suite: &Suite,
        workspace: &BuildWorkspace,
        namespace: &mut BuildNamespace,
    ) -> StageResult {
        self.provision(build, workspace).await?;
        self.setup_namespace(suite, workspace, namespace).await?;

        if let Some(command) = stage::metadata_rewrite(build, &suite.env, &workspace.dir) {
            self.run_tool(Stage::MetadataRewrite, &command).await?;
        } else {
            debug!(tid = %workspace.tid, "No metadata service configured, skipping metadata rewrite");
        }

        let command = stage::build_tool(build, &suite.env, &workspace.dir);
        self.run_tool(Stage::BuildExecution, &command).await?;

        if suite.env.do_promote {
            let output = OutputPromotion::from_flag(suite.promote_by_path);
            let summary = promote_build(self.repo.as_ref(), namespace.tid(), output)
                .await
                .map_err(|e| StageFailure::from_repository(Stage::Promotion, e))?;
            info!(
                tid = %workspace.tid,
                dependency_stores = summary.dependency_stores,
                dependency_paths = summary.dependency_paths,
                output_paths = summary.output_paths,
                "Promotion complete"
            );
        } else {
            debug!(tid = %workspace.tid, "Promotion disabled, skipping");
        }

        Ok(())
    }

    async fn provision(&self, build: &BuildDefinition, workspace: &BuildWorkspace) -> StageResult {
        let command = stage::checkout(build, &workspace.dir);
        let output = self
            .runner
            .run(&command)
            .await
            .with_context(|| format!("checkout of {} ({}) failed", build.git_url, build.git_branch))
            .map_err(|e| StageFailure::exception(Stage::Provision, e))?;

        if output.success() {
            Ok(())
        } else {
            Err(StageFailure::exception(
                Stage::Provision,
                anyhow!("checkout exited with code {}", output.exit_code),
            ))
        }
    }

    async fn setup_namespace(
        &self,
        suite: &Suite,
        workspace: &BuildWorkspace,
        namespace: &mut BuildNamespace,
    ) -> StageResult {
        let fail = |e: anyhow::Error| StageFailure::build_failure(Stage::NamespaceSetup, e);

        namespace
            .provision(&suite.stores)
            .await
            .context("store setup failed")
            .map_err(fail)?;

        let settings = SettingsDocument::for_build(&suite.env, &self.context, &workspace.tid)
            .context("cannot build settings")
            .map_err(fail)?;
        let path = settings
            .write_to(&workspace.dir)
            .context("cannot write settings.xml")
            .map_err(fail)?;
        debug!(tid = %workspace.tid, path = ?path, "Wrote build settings");

        Ok(())
    }

    async fn run_tool(&self, stage: Stage, command: &ShellCommand) -> StageResult {
        let output: CommandOutput = self
            .runner
            .run(command)
            .await
            .with_context(|| format!("{} could not run", stage))
            .map_err(|e| StageFailure::exception(stage, e))?;

        if output.success() {
            Ok(())
        } else {
            Err(StageFailure::build_failure(
                stage,
                anyhow!("{} exited with code {}", command.label, output.exit_code),
            ))
        }
    }
}
