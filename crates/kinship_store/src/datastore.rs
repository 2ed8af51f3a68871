use std::path::{Path, PathBuf};

use crate::{KinshipConfig, KinshipResult, KinshipStore};

const DEFAULT_DB_NAME: &str = "kinship.sqlite";

pub fn load_or_init_config(base: &Path) -> KinshipResult<KinshipConfig> {
    let default_sqlite = base.join(DEFAULT_DB_NAME);
    KinshipConfig::load_or_init(base, &default_sqlite)
}

pub async fn open_store(base: &Path) -> KinshipResult<KinshipStore> {
    let config = load_or_init_config(base)?;
    KinshipStore::connect(&config, base).await
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}
