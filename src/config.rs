// src/config.rs
//
// INI-style configuration: a `[database]` section plus the paths and
// analysis cadence that would otherwise be hardcoded absolute constants.
// Every path the pipeline touches is configuration- or CLI-supplied,
// defaulting to a single base directory rather than scattered absolute
// paths.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::BeaconError;

/// Environment variable that overrides the configured conn-log path.
pub const CONN_LOG_ENV_VAR: &str = "BEACONWATCH_CONN_LOG";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub conn_log: PathBuf,
    pub alerts_file: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub interval_secs: u64,
    pub window_secs: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        // 60s interval, 30-minute window for the monitor service.
        Self {
            interval_secs: 60,
            window_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load from an INI file, then apply the conn-log environment override.
    pub fn load(path: &Path) -> Result<Self, BeaconError> {
        let ini = Ini::load_from_file(path).map_err(|e| BeaconError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let db_section = ini
            .section(Some("database"))
            .ok_or_else(|| BeaconError::Config {
                path: path.to_path_buf(),
                reason: "missing [database] section".into(),
            })?;

        let get = |key: &str| -> Result<String, BeaconError> {
            db_section
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| BeaconError::Config {
                    path: path.to_path_buf(),
                    reason: format!("missing database.{key}"),
                })
        };

        let port: u16 = get("port")?.parse().map_err(|_| BeaconError::Config {
            path: path.to_path_buf(),
            reason: "database.port is not a valid u16".into(),
        })?;

        let database = DatabaseConfig {
            host: get("host")?,
            port,
            name: get("name")?,
            user: get("user")?,
            password: get("password")?,
        };

        let base_dir = ini
            .section(Some("paths"))
            .and_then(|s| s.get("base_dir"))
            .unwrap_or("/var/lib/beaconwatch")
            .to_string();
        let base_dir = PathBuf::from(base_dir);

        let conn_log = ini
            .section(Some("paths"))
            .and_then(|s| s.get("conn_log"))
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("conn.log"));

        let alerts_file = ini
            .section(Some("paths"))
            .and_then(|s| s.get("alerts_file"))
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("alerts.json"));

        let output_dir = ini
            .section(Some("paths"))
            .and_then(|s| s.get("output_dir"))
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.clone());

        let analysis_section = ini.section(Some("analysis"));
        let interval_secs = analysis_section
            .and_then(|s| s.get("interval_secs"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(AnalysisConfig::default().interval_secs);
        let window_secs = analysis_section
            .and_then(|s| s.get("window_secs"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(AnalysisConfig::default().window_secs);

        let mut paths = PathsConfig {
            conn_log,
            alerts_file,
            output_dir,
        };

        if let Ok(over) = std::env::var(CONN_LOG_ENV_VAR) {
            paths.conn_log = PathBuf::from(over);
        }

        Ok(Self {
            database,
            paths,
            analysis: AnalysisConfig {
                interval_secs,
                window_secs,
            },
        })
    }
}
