//! Integration tests for build execution with in-memory collaborators.

use indy_client::fakes::{MemoryRepository, RepoOp};
use indy_client::{RunContext, StoreKey, TrackedContent, TrackingReport};
use indyperf_core::config::{BuildDefinition, Environment, Suite};
use indyperf_core::outcome::{OutcomeStatus, Stage};
use indyperf_core::planner::plan;
use indyperf_core::PlanError;
use indyperf_pipeline::fakes::ScriptedRunner;
use indyperf_pipeline::{BuildPipeline, RunCoordinator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const INDY_URL: &str = "http://indy.example.com:8080";

struct Harness {
    repo: Arc<MemoryRepository>,
    runner: Arc<ScriptedRunner>,
    builds: TempDir,
    cache: TempDir,
}

impl Harness {
    fn new(repo: MemoryRepository, runner: ScriptedRunner) -> Self {
        Harness {
            repo: Arc::new(repo),
            runner: Arc::new(runner),
            builds: tempfile::tempdir().unwrap(),
            cache: tempfile::tempdir().unwrap(),
        }
    }

    fn pipeline(&self) -> BuildPipeline {
        BuildPipeline::new(
            self.repo.clone(),
            self.runner.clone(),
            RunContext::anonymous(INDY_URL, true),
            self.builds.path(),
        )
    }

    fn env(&self) -> Environment {
        let mut env = Environment::new(INDY_URL);
        env.local_repository_base = self.cache.path().to_path_buf();
        env
    }

    fn suite(&self) -> Suite {
        let mut suite = Suite::new(self.env())
            .with_build(BuildDefinition::new("a", "https://git.example.com/a.git").with_times(3))
            .with_build(BuildDefinition::new("b", "https://git.example.com/b.git"));
        suite.pause = Duration::ZERO;
        suite
    }
}

fn remote_download(path: &str) -> TrackedContent {
    TrackedContent {
        store_key: "maven:remote:central".to_string(),
        access_channel: "MAVEN_REPO".to_string(),
        path: path.to_string(),
        origin_url: None,
        size: None,
    }
}

/// Test: every stage passes, output promoted by path
#[tokio::test]
async fn test_successful_build() {
    let report = TrackingReport {
        uploads: Vec::new(),
        downloads: vec![remote_download("/junit/4.12/junit-4.12.jar")],
    };
    let h = Harness::new(MemoryRepository::new().with_report(report), ScriptedRunner::new());
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert!(outcome.succeeded(), "{:?}", outcome.error);
    assert_eq!(outcome.stage, Stage::Complete);
    let tid = outcome.tid.clone().unwrap();
    assert!(tid.starts_with("build_perftest-a-"));

    // No metadata service configured, so only checkout and build run
    assert_eq!(h.runner.labels(), vec!["checkout", "build"]);

    let settings = std::fs::read_to_string(h.builds.path().join(&tid).join("settings.xml")).unwrap();
    assert!(settings.contains(&format!("/api/folo/track/{0}/maven/group/{0}", tid)));

    assert!(h.repo.store(&StoreKey::hosted(&tid)).is_some());
    assert_eq!(h.repo.count(RepoOp::SealTrackingReport), 1);
    assert_eq!(h.repo.count(RepoOp::PromotePaths), 2);
    assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1);
    assert!(outcome.cleanup.is_clean());
    assert!(outcome.cleanup.deleted_group);
}

/// Test: metadata rewrite runs before the build when a service is configured
#[tokio::test]
async fn test_metadata_rewrite_runs_when_configured() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let mut suite = h.suite();
    suite.env.da_url = Some("http://da.example.com/rest".to_string());

    let outcome = h.pipeline().execute("b", suite.build("b").unwrap(), &suite).await;

    assert!(outcome.succeeded());
    assert_eq!(h.runner.labels(), vec!["checkout", "metadata_rewrite", "build"]);
    let calls = h.runner.calls();
    assert!(calls[1].command.contains("-DrestURL=http://da.example.com/rest"));
}

/// Test: a checkout failure skips every later stage but still cleans up
#[tokio::test]
async fn test_checkout_failure() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().exit_with("checkout", 128));
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::Exception);
    assert_eq!(outcome.stage, Stage::Provision);
    assert!(outcome.error.as_deref().unwrap().contains("checkout"));
    assert_eq!(h.runner.labels(), vec!["checkout"]);
    assert_eq!(h.repo.count(RepoOp::CreateStore), 0);
    assert_eq!(h.repo.count(RepoOp::SealTrackingReport), 0);
    assert_eq!(h.repo.count(RepoOp::PromotePaths), 0);
    assert!(outcome.cleanup.attempted);
}

/// Test: a checkout failure is one failure in the tally and the run goes on
#[tokio::test]
async fn test_checkout_failure_tallied_once() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().exit_with("checkout", 1));
    let mut suite = Suite::new(h.env())
        .with_build(BuildDefinition::new("a", "https://git.example.com/a.git"));
    suite.pause = Duration::ZERO;

    let report = RunCoordinator::new(h.pipeline()).run(&suite, 0, 1).await.unwrap();

    let row = report.tally.get("a").unwrap();
    assert_eq!((row.success, row.failure), (0, 1));
    assert!(!report.success());
    assert!(!h.runner.labels().contains(&"build".to_string()));
}

/// Test: with promotion disabled the repository is never called
#[tokio::test]
async fn test_promotion_disabled() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let mut suite = h.suite();
    suite.env.do_promote = false;
    suite.env.da_url = Some("http://da".to_string());

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert!(outcome.succeeded());
    assert!(h.repo.calls().is_empty(), "unexpected calls: {:?}", h.repo.calls());
    assert_eq!(h.runner.labels(), vec!["checkout", "metadata_rewrite", "build"]);
    assert!(outcome.cleanup.attempted);
    assert!(!outcome.cleanup.deleted_group);
}

/// Test: a failing metadata rewrite short-circuits build and promotion
#[tokio::test]
async fn test_metadata_rewrite_failure() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().exit_with("metadata_rewrite", 1));
    let mut suite = h.suite();
    suite.env.da_url = Some("http://da".to_string());

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::BuildFailure);
    assert_eq!(outcome.stage, Stage::MetadataRewrite);
    assert_eq!(h.runner.labels(), vec!["checkout", "metadata_rewrite"]);
    assert_eq!(h.repo.count(RepoOp::SealTrackingReport), 0);
    assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1);
}

/// Test: a failing build skips promotion
#[tokio::test]
async fn test_build_failure() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().exit_with("build", 1));
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::BuildFailure);
    assert_eq!(outcome.stage, Stage::BuildExecution);
    assert!(outcome.error.as_deref().unwrap().contains("exited with code 1"));
    assert_eq!(h.repo.count(RepoOp::SealTrackingReport), 0);
    assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1);
}

/// Test: a build tool that cannot start is an exception
#[tokio::test]
async fn test_build_tool_cannot_start() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().unstartable("build"));
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::Exception);
    assert_eq!(outcome.stage, Stage::BuildExecution);
    assert!(outcome.cleanup.attempted);
}

/// Test: store setup failure is a build failure and tools never run
#[tokio::test]
async fn test_namespace_setup_failure() {
    let h = Harness::new(MemoryRepository::new().fail_on(RepoOp::CreateStore), ScriptedRunner::new());
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::BuildFailure);
    assert_eq!(outcome.stage, Stage::NamespaceSetup);
    assert_eq!(h.runner.labels(), vec!["checkout"]);
    assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1);
}

/// Test: HTTP success with an error payload fails the promotion
#[tokio::test]
async fn test_promotion_rejected() {
    let h = Harness::new(MemoryRepository::new().reject_promotions("conflict"), ScriptedRunner::new());
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::BuildFailure);
    assert_eq!(outcome.stage, Stage::Promotion);
    assert!(outcome.error.as_deref().unwrap().contains("conflict"));
    assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1);
}

/// Test: a transport error during promotion is an exception
#[tokio::test]
async fn test_tracking_report_unavailable() {
    let h = Harness::new(
        MemoryRepository::new().fail_on(RepoOp::FetchTrackingReport),
        ScriptedRunner::new(),
    );
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert_eq!(outcome.status, OutcomeStatus::Exception);
    assert_eq!(outcome.stage, Stage::Promotion);
    assert_eq!(h.repo.count(RepoOp::PromotePaths), 0);
}

/// Test: promote-by-path false attaches the build store to the builds group
#[tokio::test]
async fn test_promote_by_group() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let mut suite = h.suite();
    suite.promote_by_path = false;

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert!(outcome.succeeded());
    assert_eq!(h.repo.count(RepoOp::PromoteGroup), 1);
    assert_eq!(h.repo.count(RepoOp::PromotePaths), 0);
}

/// Test: a cleanup failure never changes the outcome
#[tokio::test]
async fn test_cleanup_failure_keeps_success() {
    let h = Harness::new(MemoryRepository::new().fail_on(RepoOp::DeleteGroup), ScriptedRunner::new());
    let suite = h.suite();

    let outcome = h.pipeline().execute("a", suite.build("a").unwrap(), &suite).await;

    assert!(outcome.succeeded());
    assert!(outcome.cleanup.attempted);
    assert_eq!(outcome.cleanup.errors.len(), 1);
}

/// Test: cleanup runs exactly once whichever stage fails
#[tokio::test]
async fn test_cleanup_once_per_fault() {
    let faults: Vec<(MemoryRepository, ScriptedRunner)> = vec![
        (MemoryRepository::new(), ScriptedRunner::new().exit_with("checkout", 1)),
        (MemoryRepository::new().fail_on(RepoOp::StoreExists), ScriptedRunner::new()),
        (MemoryRepository::new(), ScriptedRunner::new().exit_with("metadata_rewrite", 1)),
        (MemoryRepository::new(), ScriptedRunner::new().exit_with("build", 2)),
        (MemoryRepository::new().fail_on(RepoOp::SealTrackingReport), ScriptedRunner::new()),
        (MemoryRepository::new().reject_promotions("conflict"), ScriptedRunner::new()),
        (MemoryRepository::new(), ScriptedRunner::new()),
    ];

    for (repo, runner) in faults {
        let h = Harness::new(repo, runner);
        let mut suite = h.suite();
        suite.env.da_url = Some("http://da".to_string());

        let outcome = h.pipeline().execute("b", suite.build("b").unwrap(), &suite).await;

        assert!(outcome.cleanup.attempted, "{:?}", outcome);
        assert!(h.repo.count(RepoOp::DeleteGroup) <= 1, "{:?}", outcome);
        if outcome.stage != Stage::Provision {
            assert_eq!(h.repo.count(RepoOp::DeleteGroup), 1, "{:?}", outcome);
        }
    }
}

/// Test: the coordinator runs the planned, interleaved order
#[tokio::test]
async fn test_coordinator_runs_interleaved_order() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let suite = h.suite();

    let report = RunCoordinator::new(h.pipeline()).run(&suite, 0, 1).await.unwrap();

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.build_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "a", "a"]);
    assert_eq!(report.tally.get("a").unwrap().success, 3);
    assert_eq!(report.tally.get("b").unwrap().success, 1);
    assert!(report.success());

    let mut tids: Vec<String> = report.outcomes.iter().filter_map(|o| o.tid.clone()).collect();
    tids.sort();
    tids.dedup();
    assert_eq!(tids.len(), 4);
}

/// Test: failing builds never stop the run
#[tokio::test]
async fn test_coordinator_continues_after_failures() {
    let h = Harness::new(MemoryRepository::new().reject_promotions("conflict"), ScriptedRunner::new());
    let suite = h.suite();

    let report = RunCoordinator::new(h.pipeline()).run(&suite, 0, 1).await.unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.tally.total_failure(), 4);
    assert!(!report.success());
}

/// Test: a builder only runs its own share
#[tokio::test]
async fn test_coordinator_worker_share() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let suite = h.suite();

    let report = RunCoordinator::new(h.pipeline()).run(&suite, 1, 2).await.unwrap();

    assert_eq!(report.worker_index, 1);
    assert_eq!(report.worker_count, 2);
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.build_name.as_str()).collect();
    assert_eq!(names, vec!["b"]);
}

/// Test: invalid worker identity fails before anything runs
#[tokio::test]
async fn test_coordinator_rejects_invalid_worker() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let suite = h.suite();

    let err = RunCoordinator::new(h.pipeline()).run(&suite, 2, 2).await.unwrap_err();
    assert_eq!(err, PlanError::IndexOutOfRange { index: 2, count: 2 });
    assert!(h.runner.calls().is_empty());
}

/// Test: no pause after the last build
#[tokio::test]
async fn test_no_pause_after_last_build() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new());
    let mut suite = h.suite();
    suite.pause = Duration::from_secs(30);
    let order = plan(&suite, 1, 2).unwrap();

    let started = std::time::Instant::now();
    let report = RunCoordinator::new(h.pipeline()).execute_order(&suite, &order).await;

    assert_eq!(report.outcomes.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(30));
}

/// Test: the report round-trips through JSON on disk
#[tokio::test]
async fn test_report_written_as_json() {
    let h = Harness::new(MemoryRepository::new(), ScriptedRunner::new().exit_with("build", 1));
    let suite = h.suite();
    let report = RunCoordinator::new(h.pipeline()).run(&suite, 1, 2).await.unwrap();

    let path = h.builds.path().join("report.json");
    report.write_json(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["tally"]["rows"][0]["build_name"], "b");
    assert_eq!(json["tally"]["rows"][0]["failure"], 1);
    assert_eq!(json["outcomes"][0]["stage"], "build_execution");
}
