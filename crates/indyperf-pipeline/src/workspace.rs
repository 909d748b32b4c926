//! Per-execution build directories and transaction ids.

use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of every build directory name.
pub const BUILD_DIR_PREFIX: &str = "build_perftest";

/// A freshly created, empty build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWorkspace {
    /// Absolute path of the directory.
    pub dir: PathBuf,
    /// Directory name; namespaces stores and tracking for this execution.
    pub tid: String,
}

impl BuildWorkspace {
    /// Create `<builds_dir>/build_perftest-<name>-<YYYYmmddTHHMMSS>`.
    ///
    /// A second execution within the same second gets a `-1`, `-2`, ...
    /// suffix, so every tid is distinct.
    pub fn allocate(builds_dir: &Path, build_name: &str, now: DateTime<Local>) -> io::Result<Self> {
        let builds_dir = if builds_dir.is_absolute() {
            builds_dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(builds_dir)
        };
        std::fs::create_dir_all(&builds_dir)?;

        let base = format!(
            "{}-{}-{}",
            BUILD_DIR_PREFIX,
            build_name,
            now.format("%Y%m%dT%H%M%S")
        );

        let mut attempt = 0u32;
        loop {
            let tid = match attempt {
                0 => base.clone(),
                n => format!("{}-{}", base, n),
            };
            let dir = builds_dir.join(&tid);
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok(BuildWorkspace { dir, tid }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
