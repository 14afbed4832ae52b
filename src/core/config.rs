

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Result;


pub const DEFAULT_ENTITY_TYPE: &str = "Company";

pub const DEFAULT_ADMIN_ROLE: &str = "System Manager";

const ENV_PREFIX: &str = "PURGE";

const LIST_SEPARATOR: &str = ",";


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {

    pub entity_type: String,

    pub admin_role: String,

    pub extra_excluded: Vec<String>,

    pub concurrency: usize,
    pub dry_run: bool,


    pub schema_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl PurgeConfig {

    pub fn new(entity_type: &str, admin_role: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            admin_role: admin_role.to_string(),
            extra_excluded: Vec::new(),
            concurrency: 1,
            dry_run: false,
            schema_path: None,
            data_path: None,
        }
    }


    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(entity_type) = std::env::var("PURGE_ENTITY_TYPE") {
            config.entity_type = entity_type;
        }
        if let Ok(role) = std::env::var("PURGE_ADMIN_ROLE") {
            config.admin_role = role;
        }
        if let Ok(excluded) = std::env::var("PURGE_EXTRA_EXCLUDED") {
            config.extra_excluded = excluded
                .split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(concurrency) = std::env::var("PURGE_CONCURRENCY")
            .ok()
            .and_then(|c| c.parse().ok())
        {
            config.concurrency = concurrency;
        }
        if let Ok(dry_run) = std::env::var("PURGE_DRY_RUN") {
            config.dry_run = matches!(dry_run.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(path) = std::env::var("PURGE_SCHEMA_PATH") {
            config.schema_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("PURGE_DATA_PATH") {
            config.data_path = Some(PathBuf::from(path));
        }

        config
    }


    /// Layers an optional config file under `PURGE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(LIST_SEPARATOR)
                    .with_list_parse_key("extra_excluded"),
            )
            .build()?
            .try_deserialize()?;

        config.validated()
    }


    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }


    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }


    pub fn with_extra_excluded<I, S>(mut self, record_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_excluded.extend(record_types.into_iter().map(Into::into));
        self
    }


    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    fn validated(self) -> Result<Self> {
        if self.entity_type.trim().is_empty() {
            return Err(super::error::PurgeError::Config(
                "entity_type must not be empty".to_string(),
            ));
        }
        if self.admin_role.trim().is_empty() {
            return Err(super::error::PurgeError::Config(
                "admin_role must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_TYPE, DEFAULT_ADMIN_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const PURGE_VARS: [&str; 7] = [
        "PURGE_ENTITY_TYPE",
        "PURGE_ADMIN_ROLE",
        "PURGE_EXTRA_EXCLUDED",
        "PURGE_CONCURRENCY",
        "PURGE_DRY_RUN",
        "PURGE_SCHEMA_PATH",
        "PURGE_DATA_PATH",
    ];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock();
        // SAFETY: every test touching PURGE_* holds ENV_LOCK.
        unsafe {
            for key in PURGE_VARS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        unsafe {
            for key in PURGE_VARS {
                std::env::remove_var(key);
            }
        }
        result
    }

    #[test]
    fn test_default_config() {
        let config = PurgeConfig::default();
        assert_eq!(config.entity_type, "Company");
        assert_eq!(config.admin_role, "System Manager");
        assert_eq!(config.concurrency, 1);
        assert!(!config.dry_run);
        assert!(config.extra_excluded.is_empty());
    }

    #[test]
    fn test_effective_concurrency_never_zero() {
        let config = PurgeConfig::default().with_concurrency(0);
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("purge-config-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"entity_type": "Organization", "extra_excluded": ["Asset"], "concurrency": 4}}"#
        )
        .unwrap();

        let config = with_env(&[], || PurgeConfig::load(Some(&path))).unwrap();
        assert_eq!(config.entity_type, "Organization");
        assert_eq!(config.admin_role, "System Manager");
        assert_eq!(config.extra_excluded, vec!["Asset".to_string()]);
        assert_eq!(config.concurrency, 4);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_blank_entity_type() {
        let path = std::env::temp_dir().join(format!("purge-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"entity_type": "  "}"#).unwrap();

        assert!(with_env(&[], || PurgeConfig::load(Some(&path))).is_err());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_from_env() {
        let config = with_env(
            &[
                ("PURGE_ENTITY_TYPE", "Organization"),
                ("PURGE_ADMIN_ROLE", "Purge Admin"),
                ("PURGE_EXTRA_EXCLUDED", "Asset, Lead"),
                ("PURGE_CONCURRENCY", "4"),
                ("PURGE_DRY_RUN", "yes"),
                ("PURGE_SCHEMA_PATH", "/srv/purge/schema.json"),
            ],
            PurgeConfig::from_env,
        );

        assert_eq!(config.entity_type, "Organization");
        assert_eq!(config.admin_role, "Purge Admin");
        assert_eq!(config.extra_excluded, vec!["Asset".to_string(), "Lead".to_string()]);
        assert_eq!(config.concurrency, 4);
        assert!(config.dry_run);
        assert_eq!(config.schema_path, Some(PathBuf::from("/srv/purge/schema.json")));
        assert_eq!(config.data_path, None);
    }

    #[test]
    fn test_from_env_defaults_when_unset() {
        let config = with_env(&[("PURGE_CONCURRENCY", "many")], PurgeConfig::from_env);
        assert_eq!(config.entity_type, DEFAULT_ENTITY_TYPE);
        assert_eq!(config.concurrency, 1);
        assert!(config.extra_excluded.is_empty());
    }

    #[test]
    fn test_load_env_overrides_file_and_splits_lists() {
        let path = std::env::temp_dir().join(format!("purge-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"entity_type": "Organization", "concurrency": 2}"#).unwrap();

        let config = with_env(
            &[("PURGE_EXTRA_EXCLUDED", "Asset,Lead"), ("PURGE_CONCURRENCY", "8")],
            || PurgeConfig::load(Some(&path)),
        )
        .unwrap();

        assert_eq!(config.entity_type, "Organization");
        assert_eq!(config.extra_excluded, vec!["Asset".to_string(), "Lead".to_string()]);
        assert_eq!(config.concurrency, 8);

        std::fs::remove_file(&path).ok();
    }
}
