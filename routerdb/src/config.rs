use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct MigrateConfig {
    /// Stop after this many ledger steps (exclusive end index).
    pub target: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub log_level: Option<String>,
    pub migrate: Option<MigrateConfig>,
}

/// Load `path`, or `./routerdb.yaml` if it exists. A file that cannot be
/// read or parsed is logged and ignored.
pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("routerdb.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read config");
            return None;
        }
    };
    match serde_yaml::from_str(&s) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot parse config");
            None
        }
    }
}
