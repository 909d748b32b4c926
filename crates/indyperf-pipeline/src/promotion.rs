//! Tracking report retrieval and promotion of a finished build.

use crate::namespace::SHARED_IMPORTS;
use indy_client::{GroupPromoteRequest, IndyError, PathsPromoteRequest, RepositoryApi, StoreKey};
use serde::Serialize;
use tracing::{debug, info};

/// Long-lived hosted store and group receiving build output.
pub const BUILDS: &str = "builds";

/// How build output reaches the long-lived stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPromotion {
    /// Merge every path of the per-tid hosted store into `hosted:builds`.
    ByPath,
    /// Add the per-tid hosted store to `group:builds`.
    ByGroup,
}

impl OutputPromotion {
    pub fn from_flag(promote_by_path: bool) -> Self {
        if promote_by_path {
            OutputPromotion::ByPath
        } else {
            OutputPromotion::ByGroup
        }
    }
}

/// What a successful promotion moved.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PromotionSummary {
    /// Remote stores dependencies were imported from.
    pub dependency_stores: usize,
    pub dependency_paths: usize,
    /// Paths reported complete by the output promotion.
    pub output_paths: usize,
}

/// Seal and fetch the tid's tracking report, import its upstream
/// downloads into `hosted:shared-imports`, then promote the build output.
///
/// A response carrying a non-empty `error` fails with
/// [`IndyError::PromotionRejected`].
pub async fn promote_build(
    repo: &dyn RepositoryApi,
    tid: &str,
    output: OutputPromotion,
) -> Result<PromotionSummary, IndyError> {
    repo.seal_tracking_report(tid).await?;
    let report = repo.fetch_tracking_report(tid).await?;
    debug!(tid = %tid, downloads = report.downloads.len(), uploads = report.uploads.len(), "Fetched tracking report");

    let mut summary = PromotionSummary::default();
    let shared_imports = StoreKey::hosted(SHARED_IMPORTS);

    for (source, paths) in report.remote_downloads() {
        info!(tid = %tid, source = %source, paths = paths.len(), "Promoting dependencies to {}", shared_imports);
        summary.dependency_stores += 1;
        summary.dependency_paths += paths.len();

        let request = PathsPromoteRequest::new(source.clone(), shared_imports.clone()).with_paths(paths);
        repo.promote_paths(&request).await?.check(&source)?;
    }

    let hosted = StoreKey::hosted(tid);
    let result = match output {
        OutputPromotion::ByPath => {
            info!(tid = %tid, "Promoting build output by path to {}", StoreKey::hosted(BUILDS));
            let request = PathsPromoteRequest::new(hosted.clone(), StoreKey::hosted(BUILDS));
            repo.promote_paths(&request).await?
        }
        OutputPromotion::ByGroup => {
            info!(tid = %tid, "Promoting build output by group to {}", StoreKey::group(BUILDS));
            let request = GroupPromoteRequest {
                source: hosted.clone(),
                target_group: BUILDS.to_string(),
            };
            repo.promote_group(&request).await?
        }
    };
    summary.output_paths = result.check(&hosted)?.completed_count();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indy_client::fakes::{MemoryRepository, RepoCall, RepoOp};
    use indy_client::{TrackedContent, TrackingReport};

    fn download(store: &str, channel: &str, path: &str) -> TrackedContent {
        TrackedContent {
            store_key: store.to_string(),
            access_channel: channel.to_string(),
            path: path.to_string(),
            origin_url: None,
            size: None,
        }
    }

    fn report() -> TrackingReport {
        TrackingReport {
            uploads: Vec::new(),
            downloads: vec![
                download("maven:remote:central", "MAVEN_REPO", "/a/1.pom"),
                download("maven:remote:central", "MAVEN_REPO", "/a/1.jar"),
                download("maven:remote:jboss", "NATIVE", "/b/2.jar"),
                download("maven:hosted:shared-imports", "MAVEN_REPO", "/c/3.jar"),
                download("maven:remote:central", "GENERIC_PROXY", "/d/4.tgz"),
            ],
        }
    }

    #[tokio::test]
    async fn test_promote_by_path() {
        let repo = MemoryRepository::new().with_report(report());
        let summary = promote_build(&repo, "t1", OutputPromotion::ByPath).await.unwrap();

        assert_eq!(summary.dependency_stores, 2);
        assert_eq!(summary.dependency_paths, 3);

        let calls = repo.calls();
        assert_eq!(calls[0], RepoCall::SealTrackingReport("t1".to_string()));
        assert_eq!(calls[1], RepoCall::FetchTrackingReport("t1".to_string()));

        let promotions: Vec<PathsPromoteRequest> = calls
            .iter()
            .filter_map(|c| match c {
                RepoCall::PromotePaths(r) => Some(r.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(promotions.len(), 3);
        assert_eq!(promotions[0].source.to_string(), "maven:remote:central");
        assert_eq!(promotions[0].paths, vec!["/a/1.pom", "/a/1.jar"]);
        assert_eq!(promotions[0].target, StoreKey::hosted("shared-imports"));
        assert_eq!(promotions[2].source, StoreKey::hosted("t1"));
        assert_eq!(promotions[2].target, StoreKey::hosted("builds"));
        assert!(promotions[2].paths.is_empty());
    }

    #[tokio::test]
    async fn test_promote_by_group() {
        let repo = MemoryRepository::new();
        promote_build(&repo, "t1", OutputPromotion::ByGroup).await.unwrap();

        assert_eq!(repo.count(RepoOp::PromotePaths), 0);
        assert!(repo.calls().contains(&RepoCall::PromoteGroup(GroupPromoteRequest {
            source: StoreKey::hosted("t1"),
            target_group: "builds".to_string(),
        })));
    }

    #[tokio::test]
    async fn test_service_reported_error_fails_promotion() {
        let repo = MemoryRepository::new()
            .with_report(report())
            .reject_promotions("conflict");

        let err = promote_build(&repo, "t1", OutputPromotion::ByPath).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(repo.count(RepoOp::PromotePaths), 1);
    }

    #[tokio::test]
    async fn test_seal_failure_stops_promotion() {
        let repo = MemoryRepository::new().fail_on(RepoOp::SealTrackingReport);
        assert!(promote_build(&repo, "t1", OutputPromotion::ByPath).await.is_err());
        assert_eq!(repo.count(RepoOp::FetchTrackingReport), 0);
    }

    #[test]
    fn test_output_promotion_from_flag() {
        assert_eq!(OutputPromotion::from_flag(true), OutputPromotion::ByPath);
        assert_eq!(OutputPromotion::from_flag(false), OutputPromotion::ByGroup);
    }
}
