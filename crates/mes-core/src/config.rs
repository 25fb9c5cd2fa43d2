use crate::error::{MesError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "mes.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Seed master products, operations, equipment and defect codes on open.
    #[serde(default = "default_true")]
    pub seed_master_data: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mes.db")
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            seed_master_data: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,
    /// Refuse to start when the artifacts fail to load.
    #[serde(default)]
    pub required: bool,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("ai_models/delivery_quality")
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            required: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressConfig
// ---------------------------------------------------------------------------

/// What `advance` does when the order id does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOrderPolicy {
    /// Insert the result row anyway and leave the order side untouched.
    #[default]
    Record,
    /// Fail with `OrderNotFound` and write nothing.
    Reject,
}

/// Which out-of-order steps `advance` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Accept skips and regressions, logging them.
    #[default]
    Lenient,
    /// Reject skips and regressions.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default)]
    pub unknown_order: UnknownOrderPolicy,
    #[serde(default)]
    pub ordering: OrderingPolicy,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MesError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` when given, otherwise `mes.yaml` in the working directory
    /// if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let p = Path::new(DEFAULT_CONFIG_FILE);
                if p.exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0: the OS will pick a free port".to_string(),
            });
        }

        if self.database.path.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "database.path is empty".to_string(),
            });
        }

        if !self.models.dir.exists() {
            let level = if self.models.required {
                WarnLevel::Error
            } else {
                WarnLevel::Warning
            };
            warnings.push(ConfigWarning {
                level,
                message: format!(
                    "models.dir '{}' does not exist: predictions will be skipped",
                    self.models.dir.display()
                ),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_keep_baseline_progress_behaviour() {
        let cfg = Config::default();
        assert_eq!(cfg.progress.unknown_order, UnknownOrderPolicy::Record);
        assert_eq!(cfg.progress.ordering, OrderingPolicy::Lenient);
        assert_eq!(cfg.server.port, 8000);
        assert!(!cfg.models.required);
        assert!(cfg.database.seed_master_data);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
server:
  port: 9100
progress:
  ordering: strict
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.progress.ordering, OrderingPolicy::Strict);
        assert_eq!(cfg.progress.unknown_order, UnknownOrderPolicy::Record);
        assert_eq!(cfg.database.path, PathBuf::from("mes.db"));
    }

    #[test]
    fn unknown_policy_value_is_rejected() {
        let yaml = "progress:\n  unknown_order: ignore\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf/mes.yaml");
        let mut cfg = Config::default();
        cfg.progress.unknown_order = UnknownOrderPolicy::Reject;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.progress.unknown_order, UnknownOrderPolicy::Reject);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, MesError::Config(_)));
    }

    #[test]
    fn validate_flags_missing_models_dir() {
        let mut cfg = Config::default();
        cfg.models.dir = PathBuf::from("/definitely/not/here");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("models.dir")));

        cfg.models.required = true;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("models.dir")));
    }
}
