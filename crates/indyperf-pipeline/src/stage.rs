//! Command lines for the checkout, metadata rewrite and build steps.

use crate::runner::ShellCommand;
use indyperf_core::config::{BuildDefinition, Environment};
use indyperf_core::template;
use std::path::Path;

/// Log file for the metadata rewrite tool, inside the build directory.
pub const PME_LOG: &str = "pme.log";
/// Log file for the build tool, inside the build directory.
pub const MVN_LOG: &str = "mvn.log";

/// Quote `value` for `sh` unless it only holds safe characters.
fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Local clone of the build's branch into `dir`. Must succeed.
pub fn checkout(build: &BuildDefinition, dir: &Path) -> ShellCommand {
    let command = format!(
        "git clone -l -b {} {} {}",
        quote(&build.git_branch),
        quote(&build.git_url),
        quote(&dir.to_string_lossy())
    );
    ShellCommand::new("checkout", command)
}

/// Metadata rewrite, or `None` when no metadata service is configured.
pub fn metadata_rewrite(build: &BuildDefinition, env: &Environment, dir: &Path) -> Option<ShellCommand> {
    let args = template::pme_arguments(build, env)?;
    let pom = format!("{}/pom.xml", build.context_dir());
    let command = join(&[
        "java -jar",
        &quote(&env.pme_jar.to_string_lossy()),
        "-f",
        &quote(&pom),
        "-s ./settings.xml",
        &args,
    ]);

    Some(
        ShellCommand::new("metadata_rewrite", command)
            .in_dir(dir)
            .allow_failure()
            .log_to(dir.join(PME_LOG)),
    )
}

/// Build tool invocation with the run's goals.
pub fn build_tool(build: &BuildDefinition, env: &Environment, dir: &Path) -> ShellCommand {
    let args = template::mvn_arguments(build, env);
    let pom = format!("{}/pom.xml", build.context_dir());
    let command = join(&[
        "mvn -f",
        &quote(&pom),
        "-s ./settings.xml",
        &args,
        "clean",
        &env.mvn_goals,
    ]);

    ShellCommand::new("build", command)
        .in_dir(dir)
        .allow_failure()
        .log_to(dir.join(MVN_LOG))
}
