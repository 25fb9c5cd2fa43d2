use anyhow::Context as _;
use mes_core::config::{Config, WarnLevel, DEFAULT_CONFIG_FILE};
use mes_core::db::Database;
use mes_core::predict::ModelState;
use std::path::{Path, PathBuf};

/// Configuration after applying command-line overrides.
///
/// Priority for each setting:
/// 1. `--db` / `--models` flags (or `MES_DB` / `MES_MODELS`)
/// 2. the config file named by `--config` / `MES_CONFIG`
/// 3. `mes.yaml` in the working directory
/// 4. built-in defaults
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    pub fn resolve(
        config_path: Option<&Path>,
        db: Option<&Path>,
        models: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let mut config = Config::load_or_default(config_path).context("failed to load config")?;
        if let Some(db) = db {
            config.database.path = db.to_path_buf();
        }
        if let Some(models) = models {
            config.models.dir = models.to_path_buf();
        }
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Open the database, seeding master data when configured to.
    pub fn open_db(&self) -> anyhow::Result<Database> {
        let path = &self.config.database.path;
        let db = Database::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        if self.config.database.seed_master_data {
            let conn = db.connect()?;
            mes_core::master::seed(&conn).context("failed to seed master data")?;
        }
        Ok(db)
    }

    pub fn load_models(&self) -> ModelState {
        ModelState::load(&self.config.models.dir)
    }

    /// Log config warnings; fail if any is an error.
    pub fn check(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();
        for w in self.config.validate() {
            match w.level {
                WarnLevel::Warning => tracing::warn!("{}", w.message),
                WarnLevel::Error => errors.push(w.message),
            }
        }
        if !errors.is_empty() {
            anyhow::bail!("invalid configuration:\n  {}", errors.join("\n  "));
        }
        Ok(())
    }
}
