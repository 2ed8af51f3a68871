use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kinship_core::{KinshipError, KinshipResult};

const DEFAULT_CONFIG_NAME: &str = "kinship.json";
const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;
const MAX_FACETS: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
    Mysql { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub default_page_size: Option<u64>,
    pub max_page_size: Option<u64>,
    pub max_facets: Option<usize>,
}

impl LimitsConfig {
    pub fn with_defaults() -> Self {
        Self {
            default_page_size: Some(DEFAULT_PAGE_SIZE),
            max_page_size: Some(MAX_PAGE_SIZE),
            max_facets: Some(MAX_FACETS),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KinshipConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    pub limits: Option<LimitsConfig>,
}

impl KinshipConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
        }
    }

    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> KinshipResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| KinshipError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| KinshipError::storage(format!("read config: {err}")))?;
            let config: KinshipConfig = serde_json::from_str(&raw)
                .map_err(|err| KinshipError::invalid(err.to_string()))?;
            return Ok(config);
        }
        let default = KinshipConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| KinshipError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| KinshipError::storage(format!("write config: {err}")))?;
        Ok(default)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> KinshipResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| "kinship.sqlite".to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            _ => Err(KinshipError::invalid("config is not sqlite backend")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Mysql { .. } => "mysql",
        }
    }

    pub fn connection_url(&self) -> Option<&str> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => None,
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url } => Some(url.as_str()),
        }
    }
}

/// Resolved limits applied to every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_facets: usize,
}

impl QueryLimits {
    pub fn from_config(config: &KinshipConfig) -> Self {
        let defaults = LimitsConfig::with_defaults();
        let limits = config.limits.as_ref().unwrap_or(&defaults);
        Self {
            default_page_size: limits.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_page_size: limits.max_page_size.unwrap_or(MAX_PAGE_SIZE),
            max_facets: limits.max_facets.unwrap_or(MAX_FACETS),
        }
    }

    /// Page size for a request, clamped to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::{KinshipConfig, LimitsConfig, QueryLimits};

    #[test]
    fn limits_fall_back_to_defaults() {
        let mut config = KinshipConfig::default_sqlite("x.sqlite");
        config.limits = Some(LimitsConfig {
            default_page_size: None,
            max_page_size: Some(20),
            max_facets: None,
        });
        let limits = QueryLimits::from_config(&config);
        assert_eq!(limits.default_page_size, 50);
        assert_eq!(limits.max_facets, 10);
        assert_eq!(limits.page_size(None), 20);
        assert_eq!(limits.page_size(Some(0)), 1);
        assert_eq!(limits.page_size(Some(5)), 5);
    }
}
