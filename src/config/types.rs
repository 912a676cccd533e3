//! Configuration types.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Placeholder substituted with the service name in command templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// One supervised service as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Service name, unique within the configuration.
    pub name: String,
    /// Explicit start command. Falls back to the command template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl ServiceEntry {
    /// Create an entry that uses the command template.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: None,
        }
    }

    /// Create an entry with an explicit start command.
    #[must_use]
    pub fn with_command(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: Some(command.into()),
        }
    }
}

/// A service with its start command fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub command: String,
}

/// Status endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Listen address for the status panel.
    pub addr: String,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:18080".to_string(),
            cors_permissive: false,
        }
    }
}

/// File watching and change classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Source directories watched recursively.
    pub roots: Vec<PathBuf>,
    /// Extension of tracked source files, without the dot.
    pub source_extension: String,
    /// Directory base names skipped together with their subtrees.
    pub ignored_dirs: Vec<String>,
    /// Path fragments marking annotated interface directories.
    pub interface_dirs: Vec<String>,
    /// File name suffixes marking interface sources.
    pub interface_suffixes: Vec<String>,
    /// Regular expressions matching generated artifacts.
    pub generated_patterns: Vec<String>,
    /// Debounce delay in milliseconds.
    pub debounce_ms: u64,
    /// Suppression window after a regeneration, in milliseconds.
    pub suppression_ms: u64,
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn suppression(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roots: ["internal", "pkg", "cmd"].into_iter().map(PathBuf::from).collect(),
            source_extension: "go".to_string(),
            ignored_dirs: vec!["vendor".to_string(), "node_modules".to_string()],
            interface_dirs: vec!["interfaces/endpoint".to_string()],
            interface_suffixes: vec!["_endpoint.go".to_string()],
            generated_patterns: vec![r"/interfaces/(http|rpc)/.*zz_".to_string()],
            debounce_ms: 300,
            suppression_ms: 2000,
        }
    }
}

/// Regeneration step settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerateConfig {
    /// Shell command that rebuilds generated sources.
    pub command: String,
    /// Disable to never run the regeneration step.
    pub enabled: bool,
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self {
            command: "go generate ./...".to_string(),
            enabled: true,
        }
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Default start command; `{name}` is replaced by the service name.
    pub command_template: String,
    /// Supervised services, in start order.
    pub services: Vec<ServiceEntry>,
    pub status: StatusConfig,
    pub watch: WatchConfig,
    pub regenerate: RegenerateConfig,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            command_template: "go run ./cmd/{name}".to_string(),
            services: vec![ServiceEntry::named("http-api"), ServiceEntry::named("json-rpc")],
            status: StatusConfig::default(),
            watch: WatchConfig::default(),
            regenerate: RegenerateConfig::default(),
        }
    }
}

impl DevConfig {
    /// Replace the service list with plain names from the command line.
    pub fn set_service_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.services = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .map(ServiceEntry::named)
            .collect();
    }

    /// Check the invariants that make the configuration usable.
    ///
    /// # Errors
    ///
    /// Returns an error if no services are configured, a name repeats, or a
    /// generated-artifact pattern does not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let mut seen = HashSet::new();
        for entry in &self.services {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::EmptyServiceName);
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateService(entry.name.clone()));
            }
        }

        for pattern in &self.watch.generated_patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Resolve every service entry into a concrete start command.
    #[must_use]
    pub fn service_specs(&self) -> Vec<ServiceSpec> {
        self.services
            .iter()
            .map(|entry| ServiceSpec {
                name: entry.name.clone(),
                command: entry
                    .command
                    .clone()
                    .unwrap_or_else(|| render_template(&self.command_template, &entry.name)),
            })
            .collect()
    }
}

/// Substitute the shell-escaped service name into a command template.
#[must_use]
pub fn render_template(template: &str, name: &str) -> String {
    let escaped = shell_escape::escape(Cow::Borrowed(name));
    template.replace(NAME_PLACEHOLDER, &escaped)
}
