//! Server configuration: TOML file + CLI overrides.

use bridge_core::{BridgeError, BridgeResult, Platform, PlatformProfile, ProfileOverride};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub driver: DriverSection,
    /// Per-platform profile overrides, keyed by platform name.
    #[serde(default)]
    pub platforms: HashMap<String, ProfileOverride>,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_reap_interval")]
    pub reap_interval: u64,
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            idle_timeout: default_idle_timeout(),
            reap_interval: default_reap_interval(),
            collaborator_timeout: default_collaborator_timeout(),
            probe_timeout: default_probe_timeout(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

/// `[driver]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverSection {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            user_agent: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3030
}
fn default_max_sessions() -> usize {
    16
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_reap_interval() -> u64 {
    60
}
fn default_collaborator_timeout() -> u64 {
    30
}
fn default_probe_timeout() -> u64 {
    2
}
fn default_fetch_limit() -> usize {
    50
}
fn default_webdriver_url() -> String {
    "http://127.0.0.1:9515".to_string()
}
fn default_true() -> bool {
    true
}

/// Timing and capacity knobs consumed by the session registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub collaborator_timeout: Duration,
    pub probe_timeout: Duration,
    pub fetch_limit: usize,
    pub profiles: HashMap<Platform, PlatformProfile>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let server = ServerSection::default();
        Self {
            max_sessions: server.max_sessions,
            idle_timeout: Duration::from_secs(server.idle_timeout),
            collaborator_timeout: Duration::from_secs(server.collaborator_timeout),
            probe_timeout: Duration::from_secs(server.probe_timeout),
            fetch_limit: server.fetch_limit,
            profiles: resolve_profiles(&HashMap::new()).unwrap_or_default(),
        }
    }
}

impl RegistryConfig {
    /// Page profile for `platform`, falling back to the built-in one.
    pub fn profile(&self, platform: Platform) -> PlatformProfile {
        self.profiles
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| platform.default_profile())
    }
}

/// Resolved server configuration (all paths expanded, CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub reap_interval: Duration,
    pub registry: RegistryConfig,
    pub driver: DriverSection,
}

/// CLI values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_sessions: Option<usize>,
    pub idle_timeout: Option<u64>,
    pub reap_interval: Option<u64>,
    pub webdriver_url: Option<String>,
    pub headed: bool,
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(config_path: Option<&Path>, cli: &CliOverrides) -> BridgeResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    parse(&content)?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        Self::resolve(file_config, cli)
    }

    /// Merge a parsed config file with CLI overrides and validate the result.
    pub fn resolve(file: ConfigFile, cli: &CliOverrides) -> BridgeResult<Self> {
        let server = file.server;
        let bind = cli.bind.clone().unwrap_or(server.bind);
        let port = cli.port.unwrap_or(server.port);
        let max_sessions = cli.max_sessions.unwrap_or(server.max_sessions);
        let idle_timeout = cli.idle_timeout.unwrap_or(server.idle_timeout);
        let reap_interval = cli.reap_interval.unwrap_or(server.reap_interval);

        let ip: IpAddr = bind
            .parse()
            .map_err(|e| BridgeError::Other(format!("invalid bind address {bind:?}: {e}")))?;

        if max_sessions == 0 {
            return Err(BridgeError::Other("max_sessions must be at least 1".into()));
        }
        if server.collaborator_timeout == 0 || server.probe_timeout == 0 || idle_timeout == 0 {
            return Err(BridgeError::Other("timeouts must be greater than zero".into()));
        }
        if reap_interval == 0 || reap_interval >= idle_timeout {
            return Err(BridgeError::Other(format!(
                "reap_interval ({reap_interval}s) must be between 1 and idle_timeout ({idle_timeout}s)"
            )));
        }

        let mut driver = file.driver;
        if let Some(url) = &cli.webdriver_url {
            driver.webdriver_url = url.clone();
        }
        if cli.headed {
            driver.headless = false;
        }

        Ok(Self {
            listen_addr: SocketAddr::new(ip, port),
            reap_interval: Duration::from_secs(reap_interval),
            registry: RegistryConfig {
                max_sessions,
                idle_timeout: Duration::from_secs(idle_timeout),
                collaborator_timeout: Duration::from_secs(server.collaborator_timeout),
                probe_timeout: Duration::from_secs(server.probe_timeout),
                fetch_limit: server.fetch_limit.max(1),
                profiles: resolve_profiles(&file.platforms)?,
            },
            driver,
        })
    }
}

fn parse(content: &str) -> BridgeResult<ConfigFile> {
    toml::from_str::<ConfigFile>(content)
        .map_err(|e| BridgeError::Other(format!("config parse error: {e}")))
}

/// Built-in profiles with any configured overrides applied.
fn resolve_profiles(
    overrides: &HashMap<String, ProfileOverride>,
) -> BridgeResult<HashMap<Platform, PlatformProfile>> {
    let mut profiles: HashMap<Platform, PlatformProfile> = Platform::ALL
        .iter()
        .map(|p| (*p, p.default_profile()))
        .collect();
    for (name, over) in overrides {
        let platform: Platform = name.parse()?;
        if let Some(profile) = profiles.remove(&platform) {
            profiles.insert(platform, profile.merged(over));
        }
    }
    Ok(profiles)
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    expand_tilde_str(&s)
}

fn expand_tilde_str(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
