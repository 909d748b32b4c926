//! Build-tool `settings.xml` generation.
//!
//! The document is assembled from named sections (mirror, proxy, deploy,
//! auth headers) as an element tree and serialized with escaping, so values
//! such as tokens or URLs cannot break the markup.

use crate::config::Environment;
use indy_client::RunContext;
use std::path::{Path, PathBuf};

/// Mirror and server id used for all resolution traffic.
pub const MIRROR_ID: &str = "indy";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    name: &'static str,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Element {
            name,
            text: None,
            children: Vec::new(),
        }
    }

    fn leaf(name: &'static str, text: impl Into<String>) -> Self {
        Element {
            name,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match (&self.text, self.children.is_empty()) {
            (Some(text), _) => {
                out.push_str(&format!("{}<{}>{}</{}>\n", indent, self.name, escape(text), self.name));
            }
            (None, true) => {
                out.push_str(&format!("{}<{}/>\n", indent, self.name));
            }
            (None, false) => {
                out.push_str(&format!("{}<{}>\n", indent, self.name));
                for child in &self.children {
                    child.write(out, depth + 1);
                }
                out.push_str(&format!("{}</{}>\n", indent, self.name));
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// HTTP proxy section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

/// Alternate deployment repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySection {
    pub repository_id: String,
    pub url: String,
}

/// Contents of one build's settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDocument {
    pub local_repository: PathBuf,
    pub mirror_url: String,
    pub proxy: Option<ProxySection>,
    pub deploy: Option<DeploySection>,
    /// `Authorization` header value sent with every repository request.
    pub authorization: Option<String>,
}

impl SettingsDocument {
    /// Per-tid local repository directory.
    pub fn local_repository_for(env: &Environment, tid: &str) -> PathBuf {
        env.local_repository_base.join(tid)
    }

    /// Settings for the build whose transaction id is `tid`.
    ///
    /// With promotion on, resolution goes through the tracked per-tid group;
    /// with it off, straight to the mirror target's content path.
    pub fn for_build(env: &Environment, context: &RunContext, tid: &str) -> indy_client::Result<Self> {
        let mirror_url = if env.do_promote {
            format!("{}/api/folo/track/{}/maven/group/{}", env.indy_url, tid, tid)
        } else {
            format!("{}/api/content/{}", env.indy_url, env.mirror_target.content_path())
        };

        let proxy = if env.proxy_enabled {
            Some(ProxySection {
                host: context.host()?,
                port: env.proxy_port,
                username: format!("{}+tracking", tid),
                password: context.token.clone(),
            })
        } else {
            None
        };

        let deploy = env.goals_deploy().then(|| DeploySection {
            repository_id: tid.to_string(),
            url: format!("{}/api/folo/track/{}/maven/hosted/{}", env.indy_url, tid, tid),
        });

        Ok(SettingsDocument {
            local_repository: Self::local_repository_for(env, tid),
            mirror_url,
            proxy,
            deploy,
            authorization: context.authorization(),
        })
    }

    fn server(id: &str, authorization: &str) -> Element {
        Element::new("server")
            .child(Element::leaf("id", id))
            .child(
                Element::new("configuration").child(
                    Element::new("httpHeaders").child(
                        Element::new("property")
                            .child(Element::leaf("name", "Authorization"))
                            .child(Element::leaf("value", authorization)),
                    ),
                ),
            )
    }

    fn repository(kind: &'static str, url: &str) -> Element {
        Element::new(kind)
            .child(Element::leaf("id", "central"))
            .child(Element::leaf("url", url))
            .child(Element::new("releases").child(Element::leaf("enabled", "true")))
            .child(Element::new("snapshots").child(Element::leaf("enabled", "false")))
    }

    fn to_element(&self) -> Element {
        let mut settings = Element::new("settings").child(Element::leaf(
            "localRepository",
            self.local_repository.to_string_lossy(),
        ));

        if let Some(auth) = &self.authorization {
            let mut servers = Element::new("servers").child(Self::server(MIRROR_ID, auth));
            if let Some(deploy) = &self.deploy {
                servers = servers.child(Self::server(&deploy.repository_id, auth));
            }
            settings = settings.child(servers);
        }

        settings = settings.child(
            Element::new("mirrors").child(
                Element::new("mirror")
                    .child(Element::leaf("id", MIRROR_ID))
                    .child(Element::leaf("mirrorOf", "*"))
                    .child(Element::leaf("url", &self.mirror_url)),
            ),
        );

        if let Some(proxy) = &self.proxy {
            let mut entry = Element::new("proxy")
                .child(Element::leaf("id", "indy-httprox"))
                .child(Element::leaf("active", "true"))
                .child(Element::leaf("protocol", "http"))
                .child(Element::leaf("host", &proxy.host))
                .child(Element::leaf("port", proxy.port.to_string()))
                .child(Element::leaf("username", &proxy.username));
            if let Some(password) = &proxy.password {
                entry = entry.child(Element::leaf("password", password));
            }
            entry = entry.child(Element::leaf("nonProxyHosts", &proxy.host));
            settings = settings.child(Element::new("proxies").child(entry));
        }

        let mut profiles = Element::new("profiles").child(
            Element::new("profile")
                .child(Element::leaf("id", "resolve-settings"))
                .child(
                    Element::new("repositories")
                        .child(Self::repository("repository", &self.mirror_url)),
                )
                .child(
                    Element::new("pluginRepositories")
                        .child(Self::repository("pluginRepository", &self.mirror_url)),
                ),
        );
        let mut active =
            Element::new("activeProfiles").child(Element::leaf("activeProfile", "resolve-settings"));

        if let Some(deploy) = &self.deploy {
            profiles = profiles.child(
                Element::new("profile")
                    .child(Element::leaf("id", "deploy-settings"))
                    .child(Element::new("properties").child(Element::leaf(
                        "altDeploymentRepository",
                        format!("{}::default::{}", deploy.repository_id, deploy.url),
                    ))),
            );
            active = active.child(Element::leaf("activeProfile", "deploy-settings"));
        }

        settings.child(profiles).child(active)
    }

    /// Serialized XML document.
    pub fn render(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.to_element().write(&mut out, 0);
        out
    }

    /// Write `settings.xml` into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("settings.xml");
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}
