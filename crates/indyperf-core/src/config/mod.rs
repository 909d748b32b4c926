//! Suite, environment and SSO configuration.
//!
//! Three YAML files describe a run: the suite (builds and shared stores),
//! the target environment (service URLs, proxy, promotion settings) and an
//! optional SSO file. [`load`] reads all three, applies every default and
//! reports all problems at once as [`ConfigError::Invalid`].

pub mod environment;
pub mod suite;

pub use environment::Environment;
pub use suite::{default_stores, BuildDefinition, DEFAULT_GIT_BRANCH, DEFAULT_PAUSE_SECS};

use crate::error::ConfigError;
use environment::EnvironmentFile;
use indy_client::{SsoConfig, StoreDefinition};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use suite::SuiteFile;
use tracing::debug;

/// Everything a builder needs to know about a run. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Builds in declaration order.
    pub builds: Vec<BuildDefinition>,
    /// Promote build output by path into `hosted:builds`; otherwise add the
    /// per-build hosted store to `group:builds`.
    pub promote_by_path: bool,
    /// Throttle between consecutive builds.
    pub pause: Duration,
    /// Shared stores to ensure exist before each promoted build.
    pub stores: Vec<StoreDefinition>,
    pub env: Environment,
    pub sso: SsoConfig,
}

impl Suite {
    /// Suite over `env` with no builds and default settings.
    pub fn new(env: Environment) -> Self {
        Suite {
            builds: Vec::new(),
            promote_by_path: true,
            pause: Duration::from_secs(DEFAULT_PAUSE_SECS),
            stores: default_stores(),
            env,
            sso: SsoConfig::default(),
        }
    }

    pub fn with_build(mut self, build: BuildDefinition) -> Self {
        self.builds.push(build);
        self
    }

    pub fn build(&self, name: &str) -> Option<&BuildDefinition> {
        self.builds.iter().find(|b| b.name == name)
    }

    /// Build a suite from YAML text.
    ///
    /// `sso_yaml`, when given, replaces any `sso` section of the environment.
    pub fn from_yaml(
        suite_yaml: &str,
        env_yaml: &str,
        sso_yaml: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let suite_file: SuiteFile = parse_or_report(suite_yaml, "suite", &mut problems);
        let env_file: EnvironmentFile = parse_or_report(env_yaml, "environment", &mut problems);
        let sso_file: Option<SsoConfig> =
            sso_yaml.map(|y| parse_or_report(y, "SSO", &mut problems));

        Self::resolve(suite_file, env_file, sso_file, problems)
    }

    fn resolve(
        suite_file: SuiteFile,
        mut env_file: EnvironmentFile,
        sso_file: Option<SsoConfig>,
        mut problems: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let sso = sso_file.or_else(|| env_file.sso.take()).unwrap_or_default();
        problems.extend(sso.problems());

        let env = Environment::resolve(env_file, &mut problems);
        let builds = suite::resolve_builds(suite_file.builds, &mut problems);
        let stores = suite::resolve_stores(suite_file.stores, &mut problems);

        match env {
            Some(env) if problems.is_empty() => Ok(Suite {
                builds,
                promote_by_path: suite_file.promote_by_path.unwrap_or(true),
                pause: Duration::from_secs(
                    suite_file.pause_between_builds.unwrap_or(DEFAULT_PAUSE_SECS),
                ),
                stores,
                env,
                sso,
            }),
            _ => Err(ConfigError::Invalid(problems)),
        }
    }
}

/// Read and validate the suite, environment and optional SSO files.
///
/// A given SSO path must exist.
pub fn load(suite_path: &Path, env_path: &Path, sso_path: Option<&Path>) -> Result<Suite, ConfigError> {
    load_with_problems(suite_path, env_path, sso_path, Vec::new())
}

/// Like [`load`], but starts from problems the caller already found so
/// they are reported in the same listing. Fails if `problems` is non-empty.
pub fn load_with_problems(
    suite_path: &Path,
    env_path: &Path,
    sso_path: Option<&Path>,
    mut problems: Vec<String>,
) -> Result<Suite, ConfigError> {
    let suite_file: SuiteFile = read_or_report(suite_path, "suite", &mut problems);
    let env_file: EnvironmentFile = read_or_report(env_path, "environment", &mut problems);
    let sso_file: Option<SsoConfig> = sso_path.map(|path| read_or_report(path, "SSO", &mut problems));
    debug!(problems = problems.len(), "Read configuration files");

    Suite::resolve(suite_file, env_file, sso_file, problems)
}

fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Empty documents deserialize as the default value.
fn parse_yaml<T: DeserializeOwned + Default>(content: &str) -> Result<T, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str::<Option<T>>(content).map(Option::unwrap_or_default)
}

fn read_or_report<T: DeserializeOwned + Default>(
    path: &Path,
    what: &str,
    problems: &mut Vec<String>,
) -> T {
    match read_yaml(path) {
        Ok(value) => value,
        Err(e) => {
            problems.push(format!("{} file: {}", what, e));
            T::default()
        }
    }
}

fn parse_or_report<T: DeserializeOwned + Default>(
    content: &str,
    what: &str,
    problems: &mut Vec<String>,
) -> T {
    match parse_yaml(content) {
        Ok(value) => value,
        Err(e) => {
            problems.push(format!("{} file: {}", what, e));
            T::default()
        }
    }
}
