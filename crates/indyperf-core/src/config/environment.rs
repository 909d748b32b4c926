//! Target environment: where the repository service lives and how builds reach it.

use indy_client::{SsoConfig, StoreKey};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_PROXY_PORT: u16 = 8081;
pub const DEFAULT_PME_VERSION_SUFFIX: &str = "build";
pub const DEFAULT_MVN_GOALS: &str = "deploy";
pub const DEFAULT_PROMOTION_TARGET: &str = "maven:group:builds";
pub const DEFAULT_MIRROR_TARGET: &str = "maven:group:public";
pub const DEFAULT_PME_JAR: &str = "/usr/share/pme/pme.jar";
pub const DEFAULT_LOCAL_REPOSITORY_BASE: &str = "/tmp/repository";

/// Environment file as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct EnvironmentFile {
    pub indy_url: Option<String>,
    #[serde(rename = "DA-url", alias = "da-url")]
    pub da_url: Option<String>,
    pub proxy_enabled: Option<bool>,
    pub proxy_port: Option<u16>,
    pub ssl_verify: Option<bool>,
    pub pme_version_suffix: Option<String>,
    pub mvn_goals: Option<String>,
    pub do_promote: Option<bool>,
    pub promotion_target: Option<String>,
    pub mirror_target: Option<String>,
    pub pme_jar: Option<PathBuf>,
    pub local_repository_base: Option<PathBuf>,
    pub sso: Option<SsoConfig>,
}

/// Resolved environment settings, every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Repository service base URL, no trailing slash.
    pub indy_url: String,
    /// Dependency-analysis (metadata) service URL; metadata rewrite is skipped without it.
    pub da_url: Option<String>,
    pub proxy_enabled: bool,
    pub proxy_port: u16,
    pub ssl_verify: bool,
    pub pme_version_suffix: String,
    pub mvn_goals: String,
    /// Create per-build stores and promote results.
    pub do_promote: bool,
    /// Group added to every per-build group.
    pub promotion_target: StoreKey,
    /// Store resolved directly when promotion is off.
    pub mirror_target: StoreKey,
    pub pme_jar: PathBuf,
    pub local_repository_base: PathBuf,
}

impl Environment {
    /// Environment with every optional setting at its default.
    pub fn new(indy_url: &str) -> Self {
        Environment {
            indy_url: indy_url.trim_end_matches('/').to_string(),
            da_url: None,
            proxy_enabled: false,
            proxy_port: DEFAULT_PROXY_PORT,
            ssl_verify: true,
            pme_version_suffix: DEFAULT_PME_VERSION_SUFFIX.to_string(),
            mvn_goals: DEFAULT_MVN_GOALS.to_string(),
            do_promote: true,
            promotion_target: StoreKey::group("builds"),
            mirror_target: StoreKey::group("public"),
            pme_jar: PathBuf::from(DEFAULT_PME_JAR),
            local_repository_base: PathBuf::from(DEFAULT_LOCAL_REPOSITORY_BASE),
        }
    }

    /// Whether the goal string publishes artifacts.
    pub fn goals_deploy(&self) -> bool {
        self.mvn_goals
            .split_whitespace()
            .any(|goal| goal == "deploy" || goal.ends_with(":deploy"))
    }

    /// Settings that load fine but will make builds fail.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.do_promote && self.goals_deploy() {
            warnings.push(format!(
                "mvn-goals '{}' deploy to the per-build hosted store, which is only created when do-promote is true",
                self.mvn_goals
            ));
        }
        warnings
    }

    pub(crate) fn resolve(file: EnvironmentFile, problems: &mut Vec<String>) -> Option<Self> {
        let indy_url = match file.indy_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                problems.push("Missing Indy URL configuration: indy-url".to_string());
                return None;
            }
        };

        let mut env = Environment::new(indy_url);

        env.da_url = file
            .da_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        env.proxy_enabled = file.proxy_enabled.unwrap_or(false);
        env.proxy_port = file.proxy_port.unwrap_or(DEFAULT_PROXY_PORT);
        env.ssl_verify = file.ssl_verify.unwrap_or(true);
        env.do_promote = file.do_promote.unwrap_or(true);

        if let Some(suffix) = file.pme_version_suffix.filter(|s| !s.is_empty()) {
            env.pme_version_suffix = suffix;
        }
        if let Some(goals) = file.mvn_goals.filter(|g| !g.trim().is_empty()) {
            env.mvn_goals = goals;
        }
        if let Some(jar) = file.pme_jar {
            env.pme_jar = jar;
        }
        if let Some(base) = file.local_repository_base {
            env.local_repository_base = base;
        }

        let promotion_target = file
            .promotion_target
            .unwrap_or_else(|| DEFAULT_PROMOTION_TARGET.to_string());
        match promotion_target.parse() {
            Ok(key) => env.promotion_target = key,
            Err(e) => problems.push(format!("promotion-target: {}", e)),
        }

        let mirror_target = file
            .mirror_target
            .unwrap_or_else(|| DEFAULT_MIRROR_TARGET.to_string());
        match mirror_target.parse() {
            Ok(key) => env.mirror_target = key,
            Err(e) => problems.push(format!("mirror-target: {}", e)),
        }

        Some(env)
    }
}
