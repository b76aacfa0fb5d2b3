use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dcimsync_core::EntityKind;
use dcimsync_engine::MarkerTag;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub netbox: NetBoxConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tag: MarkerTag,
}

impl AppConfig {
    /// Full validation, required before talking to NetBox.
    pub fn validate(&self) -> Result<(), String> {
        self.validate_local()?;
        // NetBox validations
        if self.netbox.url.trim().is_empty() {
            return Err("netbox.url is required".into());
        }
        match url::Url::parse(&self.netbox.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(format!(
                    "netbox.url must use http or https, got '{}'",
                    parsed.scheme()
                ));
            }
            Err(e) => return Err(format!("netbox.url is not a valid URL: {e}")),
        }
        if self.netbox.token.trim().is_empty() {
            return Err("netbox.token is required".into());
        }
        if self.netbox.timeout_secs == 0 {
            return Err("netbox.timeout_secs must be > 0".into());
        }
        Ok(())
    }

    /// Checks the settings used without a NetBox connection (ledger views).
    pub fn validate_local(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Marker tag validation
        if self.tag.name.trim().is_empty() || self.tag.slug.trim().is_empty() {
            return Err("tag.name and tag.slug must not be empty".into());
        }
        if self.tag.color.len() != 6 || !self.tag.color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("tag.color must be six hex digits, e.g. 4caf50".into());
        }
        Ok(())
    }

    /// Library directory holding definitions of `kind`.
    pub fn library_dir(&self, kind: EntityKind) -> PathBuf {
        self.library.root.join(kind.as_str())
    }

    pub fn ledger_path(&self, kind: EntityKind) -> PathBuf {
        self.state
            .dir
            .join(format!("{}_progress.json", kind.ledger_key()))
    }

    /// Directory for per-item error logs of `kind`.
    pub fn logs_dir(&self, kind: EntityKind) -> PathBuf {
        self.state.dir.join("logs").join(kind.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_verify_tls() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
impl Default for NetBoxConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            verify_tls: default_verify_tls(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_library_root")]
    pub root: PathBuf,
}
fn default_library_root() -> PathBuf {
    PathBuf::from("library")
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".dcimsync")
}
impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default file looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "dcimsync.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., DCIMSYNC__NETBOX__URL=https://netbox.local
        builder = builder.add_source(
            Environment::with_prefix("DCIMSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        cfg.try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))
    }
}
