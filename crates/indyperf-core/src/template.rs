//! Argument templates for the metadata rewrite and build tools.
//!
//! Templates use `{name}` placeholders. Unknown placeholders are left as
//! written so tool arguments that happen to contain braces pass through.

use crate::config::{BuildDefinition, Environment};

/// Metadata rewrite arguments used when a build sets no `pme-args`.
pub const DEFAULT_PME_ARGS: &[&str] = &[
    "-DrestURL={da_url}",
    "-DversionIncrementalSuffix={version_suffix}",
    "-DallowConfigFilePrecedence=true",
    "-DrepoReportingRemoval=true",
    "-DdependencySource=REST",
    "-DrepoRemovalBackup=repositories-backup.xml",
    "-DprojectSrcSkip=false",
    "-DversionIncrementalSuffixPadding=5",
    "-DversionSuffixStrip=",
];

/// Substitute `{key}` for each `(key, value)`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

/// Metadata rewrite arguments, or `None` when no metadata service is configured.
pub fn pme_arguments(build: &BuildDefinition, env: &Environment) -> Option<String> {
    let da_url = env.da_url.as_deref()?;
    let template = build
        .pme_args
        .clone()
        .unwrap_or_else(|| DEFAULT_PME_ARGS.join(" "));

    Some(render(
        &template,
        &[
            ("da_url", da_url),
            ("version_suffix", &env.pme_version_suffix),
            ("indy_url", &env.indy_url),
        ],
    ))
}

/// Build tool arguments for `build`.
pub fn mvn_arguments(build: &BuildDefinition, env: &Environment) -> String {
    let template = build.mvn_args.as_deref().unwrap_or_default();
    render(template, &[("indy_url", &env.indy_url)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_known_keys_only() {
        let out = render("-Da={a} -Db={b} -Dc={a}", &[("a", "1")]);
        assert_eq!(out, "-Da=1 -Db={b} -Dc=1");
    }

    #[test]
    fn test_pme_skipped_without_da_url() {
        let env = Environment::new("http://indy");
        let build = BuildDefinition::new("a", "url");
        assert!(pme_arguments(&build, &env).is_none());
    }

    #[test]
    fn test_default_pme_args_templated() {
        let mut env = Environment::new("http://indy");
        env.da_url = Some("http://da/rest".to_string());
        env.pme_version_suffix = "perf".to_string();

        let args = pme_arguments(&BuildDefinition::new("a", "url"), &env).unwrap();
        assert!(args.starts_with("-DrestURL=http://da/rest "));
        assert!(args.contains("-DversionIncrementalSuffix=perf "));
        assert!(!args.contains('{'));
    }

    #[test]
    fn test_custom_pme_args() {
        let mut env = Environment::new("http://indy");
        env.da_url = Some("http://da".to_string());
        let mut build = BuildDefinition::new("a", "url");
        build.pme_args = Some("-DrestURL={da_url} -Dx=y".to_string());

        assert_eq!(pme_arguments(&build, &env).unwrap(), "-DrestURL=http://da -Dx=y");
    }

    #[test]
    fn test_mvn_arguments() {
        let env = Environment::new("http://indy:8080");
        let mut build = BuildDefinition::new("a", "url");
        assert_eq!(mvn_arguments(&build, &env), "");

        build.mvn_args = Some("-DskipTests -Drepo={indy_url}/api".to_string());
        assert_eq!(
            mvn_arguments(&build, &env),
            "-DskipTests -Drepo=http://indy:8080/api"
        );
    }
}
