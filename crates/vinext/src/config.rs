// File: src/config.rs
// Purpose: Configuration parsing from vinext.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::PipelineError;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub dev: DevConfig,

    #[serde(default)]
    pub headers: Vec<HeaderRule>,

    #[serde(default)]
    pub redirects: Vec<RedirectRule>,

    #[serde(default)]
    pub rewrites: RewritesConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// App Router directory (default: "app")
    #[serde(default = "default_app_dir")]
    pub app_dir: String,

    /// Pages Router directory (default: "pages")
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Extensions that make a file routable
    #[serde(default = "default_page_extensions")]
    pub page_extensions: Vec<String>,

    /// Base path for all routes (e.g., "/docs")
    #[serde(default)]
    pub base_path: Option<String>,

    /// Whether canonical URLs end with a slash
    #[serde(default = "default_false")]
    pub trailing_slash: bool,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Development mode: middleware errors are returned unredacted
    #[serde(default = "default_false")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub hot_reload: bool,

    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,
}

/// A request condition for `has` / `missing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteHas {
    Header {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    Cookie {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    Query {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    Host { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

/// `[[headers]]`: response headers for matching paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRule {
    pub source: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default)]
    pub has: Vec<RouteHas>,
    #[serde(default)]
    pub missing: Vec<RouteHas>,
}

/// `[[redirects]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectRule {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub has: Vec<RouteHas>,
    #[serde(default)]
    pub missing: Vec<RouteHas>,
    /// `false` keeps an internal destination free of the base path
    #[serde(default, alias = "basePath")]
    pub base_path: Option<bool>,
}

/// One rewrite rule in any phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub has: Vec<RouteHas>,
    #[serde(default)]
    pub missing: Vec<RouteHas>,
}

/// Three-phase rewrites
///
/// A bare `[[rewrites]]` array is read as `after_files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawRewrites")]
pub struct RewritesConfig {
    pub before_files: Vec<RewriteRule>,
    pub after_files: Vec<RewriteRule>,
    pub fallback: Vec<RewriteRule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRewrites {
    List(Vec<RewriteRule>),
    Phased {
        #[serde(default, alias = "beforeFiles")]
        before_files: Vec<RewriteRule>,
        #[serde(default, alias = "afterFiles")]
        after_files: Vec<RewriteRule>,
        #[serde(default)]
        fallback: Vec<RewriteRule>,
    },
}

impl From<RawRewrites> for RewritesConfig {
    fn from(raw: RawRewrites) -> Self {
        match raw {
            RawRewrites::List(after_files) => Self {
                after_files,
                ..Self::default()
            },
            RawRewrites::Phased {
                before_files,
                after_files,
                fallback,
            } => Self {
                before_files,
                after_files,
                fallback,
            },
        }
    }
}

// Default values
fn default_name() -> String {
    "vinext-app".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_page_extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js"].iter().map(|e| e.to_string()).collect()
}

fn default_watch_paths() -> Vec<String> {
    vec!["app".to_string(), "pages".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

// Default implementations
impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            pages_dir: default_pages_dir(),
            page_extensions: default_page_extensions(),
            base_path: None,
            trailing_slash: false,
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hot_reload: true,
            watch_paths: default_watch_paths(),
        }
    }
}

impl RoutingConfig {
    /// Configured base path, with an empty string treated as unset
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref().filter(|p| !p.is_empty())
    }
}

impl Config {
    /// Load configuration from vinext.toml
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./vinext.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("vinext.toml")
    }

    /// Checks the shape of the base path and every rule source
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(base_path) = self.routing.base_path() {
            if !base_path.starts_with('/') || base_path.ends_with('/') {
                return Err(PipelineError::InvalidRule {
                    kind: "base path",
                    pattern: base_path.to_string(),
                    reason: "must start with `/` and must not end with `/`".to_string(),
                });
            }
        }

        let sources = self
            .headers
            .iter()
            .map(|rule| ("header", &rule.source))
            .chain(self.redirects.iter().map(|rule| ("redirect", &rule.source)))
            .chain(
                self.rewrites
                    .before_files
                    .iter()
                    .chain(&self.rewrites.after_files)
                    .chain(&self.rewrites.fallback)
                    .map(|rule| ("rewrite", &rule.source)),
            );

        for (kind, source) in sources {
            if !source.starts_with('/') {
                return Err(PipelineError::InvalidRule {
                    kind,
                    pattern: source.clone(),
                    reason: "source must start with `/`".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.routing.app_dir, "app");
        assert_eq!(config.routing.pages_dir, "pages");
        assert_eq!(config.routing.page_extensions, vec!["tsx", "ts", "jsx", "js"]);
        assert!(!config.routing.trailing_slash);
        assert!(!config.dev.enabled);
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.server.port, 3000);
        assert!(config.rewrites.after_files.is_empty());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("vinext.toml")).unwrap();
        assert_eq!(config.project.name, "vinext-app");
    }

    #[test]
    fn test_rules() {
        let toml = r#"
            [routing]
            base_path = "/docs"

            [[headers]]
            source = "/api/:path*"
            headers = [{ key = "x-api", value = "1" }]

            [[redirects]]
            source = "/old/:slug"
            destination = "/new/:slug"
            permanent = true
            has = [{ type = "cookie", key = "beta" }]

            [rewrites]
            before_files = [{ source = "/before-rewrite", destination = "/about" }]
            fallback = [{ source = "/:path*", destination = "https://legacy.example.com/:path*" }]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.routing.base_path(), Some("/docs"));
        assert_eq!(config.headers[0].headers[0].key, "x-api");
        assert!(config.redirects[0].permanent);
        assert_eq!(
            config.redirects[0].has,
            vec![RouteHas::Cookie {
                key: "beta".into(),
                value: None
            }]
        );
        assert_eq!(config.rewrites.before_files[0].destination, "/about");
        assert!(config.rewrites.after_files.is_empty());
        assert_eq!(config.rewrites.fallback.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bare_rewrite_array_is_after_files() {
        let toml = r#"
            [[rewrites]]
            source = "/a"
            destination = "/b"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.rewrites.after_files.len(), 1);
        assert!(config.rewrites.before_files.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_base_path_and_sources() {
        let mut config = Config::default();
        config.routing.base_path = Some("/docs/".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.redirects.push(RedirectRule {
            source: "old".into(),
            destination: "/new".into(),
            permanent: false,
            has: vec![],
            missing: vec![],
            base_path: None,
        });
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidRule { kind: "redirect", .. })
        ));
    }
}
