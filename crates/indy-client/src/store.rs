//! Artifact store identity and definitions.

use crate::error::IndyError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Package type assumed when a key or descriptor does not name one.
pub const DEFAULT_PACKAGE_TYPE: &str = "maven";

/// Kind of artifact store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Holds uploaded content.
    Hosted,
    /// Ordered aggregation of other stores.
    Group,
    /// Proxy of an upstream repository.
    Remote,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Hosted => "hosted",
            StoreType::Group => "group",
            StoreType::Remote => "remote",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = IndyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hosted" => Ok(StoreType::Hosted),
            "group" => Ok(StoreType::Group),
            "remote" => Ok(StoreType::Remote),
            other => Err(IndyError::InvalidStoreKey(format!(
                "unknown store type '{}'",
                other
            ))),
        }
    }
}

/// Fully-qualified store key, `package:type:name`.
///
/// Parses the legacy two-part `type:name` form too, assuming the `maven`
/// package type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub package_type: String,
    pub store_type: StoreType,
    pub name: String,
}

impl StoreKey {
    pub fn new(package_type: &str, store_type: StoreType, name: &str) -> Self {
        StoreKey {
            package_type: package_type.to_string(),
            store_type,
            name: name.to_string(),
        }
    }

    /// Maven hosted store key.
    pub fn hosted(name: &str) -> Self {
        Self::new(DEFAULT_PACKAGE_TYPE, StoreType::Hosted, name)
    }

    /// Maven group key.
    pub fn group(name: &str) -> Self {
        Self::new(DEFAULT_PACKAGE_TYPE, StoreType::Group, name)
    }

    pub fn is_remote(&self) -> bool {
        self.store_type == StoreType::Remote
    }

    /// Path segment used by the content API: `maven/group/public`.
    pub fn content_path(&self) -> String {
        format!("{}/{}/{}", self.package_type, self.store_type, self.name)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package_type, self.store_type, self.name)
    }
}

impl FromStr for StoreKey {
    type Err = IndyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (package_type, store_type, name) = match parts.as_slice() {
            [pkg, ty, name] => (*pkg, *ty, *name),
            [ty, name] => (DEFAULT_PACKAGE_TYPE, *ty, *name),
            _ => return Err(IndyError::InvalidStoreKey(s.to_string())),
        };

        if package_type.is_empty() || name.is_empty() {
            return Err(IndyError::InvalidStoreKey(s.to_string()));
        }

        let store_type = store_type
            .parse()
            .map_err(|_| IndyError::InvalidStoreKey(s.to_string()))?;

        Ok(StoreKey::new(package_type, store_type, name))
    }
}

impl Serialize for StoreKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StoreKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Store definition as posted to `/api/admin/stores/{packageType}/{type}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDefinition {
    pub key: StoreKey,
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: StoreType,
    #[serde(rename = "packageType")]
    pub package_type: String,
    pub doctype: StoreType,
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_releases: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_snapshots: Option<bool>,

    /// Member keys, groups only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<StoreKey>,

    /// Upstream URL, remotes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StoreDefinition {
    fn base(key: StoreKey) -> Self {
        StoreDefinition {
            name: key.name.clone(),
            store_type: key.store_type,
            package_type: key.package_type.clone(),
            doctype: key.store_type,
            disabled: false,
            allow_releases: None,
            allow_snapshots: None,
            constituents: Vec::new(),
            url: None,
            key,
        }
    }

    /// Hosted store accepting releases.
    pub fn hosted(key: StoreKey) -> Self {
        let mut def = Self::base(key);
        def.allow_releases = Some(true);
        def
    }

    /// Group with the given members, in resolution order.
    pub fn group(key: StoreKey, constituents: Vec<StoreKey>) -> Self {
        let mut def = Self::base(key);
        def.constituents = constituents;
        def
    }

    /// Remote proxy of `url`.
    pub fn remote(key: StoreKey, url: &str) -> Self {
        let mut def = Self::base(key);
        def.url = Some(url.to_string());
        def
    }
}
