mod codec;
pub mod compile;
pub mod config;
pub mod datastore;
mod db;
pub mod migration;
pub mod store;

pub use compile::{apply_selection, build_entity_query, build_relation_query, facet_statement};
pub use config::{DatabaseConfig, KinshipConfig, LimitsConfig, PoolConfig, QueryLimits};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use kinship_core::*;
pub use store::KinshipStore;
