//! Suite file: the ordered builds to cycle and the shared stores they need.

use indy_client::{StoreDefinition, StoreKey, StoreType, DEFAULT_PACKAGE_TYPE};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

pub const DEFAULT_GIT_BRANCH: &str = "master";
pub const DEFAULT_PAUSE_SECS: u64 = 5;

/// One build entry as written in the suite file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct BuildSpec {
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_context_dir: Option<String>,
    pub mvn_args: Option<String>,
    pub pme_args: Option<String>,
    pub times: Option<i64>,
}

/// Shared store the suite expects to exist.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct StoreDescriptor {
    #[serde(rename = "type")]
    pub store_type: StoreType,
    pub name: String,
    pub package_type: Option<String>,
    pub allow_releases: Option<bool>,
    pub allow_snapshots: Option<bool>,
    #[serde(default)]
    pub constituents: Vec<String>,
    pub url: Option<String>,
}

impl StoreDescriptor {
    fn into_definition(self) -> Result<StoreDefinition, String> {
        if self.name.trim().is_empty() {
            return Err("store with an empty name".to_string());
        }

        let package_type = self
            .package_type
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_string());
        let key = StoreKey::new(&package_type, self.store_type, &self.name);

        let mut def = match self.store_type {
            StoreType::Hosted => StoreDefinition::hosted(key.clone()),
            StoreType::Group => {
                let constituents = self
                    .constituents
                    .iter()
                    .map(|c| c.parse::<StoreKey>().map_err(|e| format!("store {}: {}", key, e)))
                    .collect::<Result<Vec<_>, _>>()?;
                StoreDefinition::group(key.clone(), constituents)
            }
            StoreType::Remote => {
                let url = self
                    .url
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| format!("remote store {} has no url", key))?;
                StoreDefinition::remote(key.clone(), &url)
            }
        };

        if self.allow_releases.is_some() {
            def.allow_releases = self.allow_releases;
        }
        def.allow_snapshots = self.allow_snapshots;
        Ok(def)
    }
}

/// Suite file as written on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct SuiteFile {
    #[serde(default, deserialize_with = "ordered_builds")]
    pub builds: Vec<(String, BuildSpec)>,
    pub promote_by_path: Option<bool>,
    pub pause_between_builds: Option<u64>,
    pub stores: Option<Vec<StoreDescriptor>>,
}

/// Keep builds in declaration order; the order is what partitions work
/// between builders.
fn ordered_builds<'de, D>(deserializer: D) -> Result<Vec<(String, BuildSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BuildsVisitor;

    impl<'de> Visitor<'de> for BuildsVisitor {
        type Value = Vec<(String, BuildSpec)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of build name to build definition")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut builds: Vec<(String, BuildSpec)> = Vec::new();
            while let Some((name, spec)) = map.next_entry::<String, Option<BuildSpec>>()? {
                if builds.iter().any(|(existing, _)| *existing == name) {
                    return Err(de::Error::custom(format!("duplicate build '{}'", name)));
                }
                builds.push((name, spec.unwrap_or_default()));
            }
            Ok(builds)
        }
    }

    deserializer.deserialize_any(BuildsVisitor)
}

/// One build the suite can run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDefinition {
    pub name: String,
    pub git_url: String,
    pub git_branch: String,
    pub git_context_dir: Option<String>,
    pub mvn_args: Option<String>,
    pub pme_args: Option<String>,
    /// Raw repeat count as configured.
    pub times: Option<i64>,
}

impl BuildDefinition {
    pub fn new(name: &str, git_url: &str) -> Self {
        BuildDefinition {
            name: name.to_string(),
            git_url: git_url.to_string(),
            git_branch: DEFAULT_GIT_BRANCH.to_string(),
            git_context_dir: None,
            mvn_args: None,
            pme_args: None,
            times: None,
        }
    }

    pub fn with_times(mut self, times: i64) -> Self {
        self.times = Some(times);
        self
    }

    /// How many times this build runs across all builders; at least 1.
    pub fn repeat_count(&self) -> usize {
        match self.times {
            Some(n) if n > 0 => n as usize,
            _ => 1,
        }
    }

    /// Directory holding the project file, relative to the checkout.
    pub fn context_dir(&self) -> &str {
        self.git_context_dir
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(".")
    }

    fn resolve(name: String, spec: BuildSpec, problems: &mut Vec<String>) -> Option<Self> {
        let git_url = match spec.git_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None => {
                problems.push(format!("Build '{}' has no git-url", name));
                return None;
            }
        };

        Some(BuildDefinition {
            git_branch: spec
                .git_branch
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| DEFAULT_GIT_BRANCH.to_string()),
            git_context_dir: spec.git_context_dir,
            mvn_args: spec.mvn_args,
            pme_args: spec.pme_args,
            times: spec.times,
            name,
            git_url,
        })
    }
}

/// Stores every suite relies on when none are listed.
pub fn default_stores() -> Vec<StoreDefinition> {
    vec![
        StoreDefinition::hosted(StoreKey::hosted("builds")),
        StoreDefinition::hosted(StoreKey::hosted("shared-imports")),
        StoreDefinition::group(StoreKey::group("builds"), vec![StoreKey::hosted("builds")]),
        StoreDefinition::group(StoreKey::group("brew_proxies"), Vec::new()),
    ]
}

pub(crate) fn resolve_builds(
    specs: Vec<(String, BuildSpec)>,
    problems: &mut Vec<String>,
) -> Vec<BuildDefinition> {
    specs
        .into_iter()
        .filter_map(|(name, spec)| BuildDefinition::resolve(name, spec, problems))
        .collect()
}

pub(crate) fn resolve_stores(
    descriptors: Option<Vec<StoreDescriptor>>,
    problems: &mut Vec<String>,
) -> Vec<StoreDefinition> {
    match descriptors {
        None => default_stores(),
        Some(descriptors) => descriptors
            .into_iter()
            .filter_map(|d| d.into_definition().map_err(|e| problems.push(e)).ok())
            .collect(),
    }
}
