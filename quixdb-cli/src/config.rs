use serde_derive::{Deserialize, Serialize};

/// Persistent CLI configuration, loaded from the OS-standard config
/// directory via `confy` (e.g. `~/.config/quixdb-cli/config.toml` on
/// Linux) and overridable per-invocation by CLI flags.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Default database root used when a command's `--db` is omitted.
    pub db_dir: Option<String>,
    /// Default `log` level filter (e.g. "info", "debug").
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config { db_dir: None, log_level: "info".to_string() }
    }
}

impl Config {
    pub fn load() -> Self {
        confy::load("quixdb-cli", "config").unwrap_or_default()
    }
}
