use std::path::Path;
use std::sync::Arc;

use crate::app::error::{Result, SyncError};
use crate::config::Config;
use crate::remote::{HttpRemote, RemoteClient};
use crate::store::sqlite::SqliteStore;
use crate::sync::SyncEngine;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub engine: SyncEngine<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::new(&db_path, config.store.search)?);
        Self::with_store(config, store)
    }

    pub fn with_db_path(config: Config, db_path: &Path) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(db_path, config.store.search)?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let options = config.sync_options();
        let remote: Arc<dyn RemoteClient + Send + Sync> = Arc::new(
            HttpRemote::new(
                &config.remote.base_url,
                config.remote.username.clone(),
                config.remote.password.clone(),
                options.request_timeout,
            )
            .map_err(|e| SyncError::remote("build remote client", e))?,
        );
        let engine = SyncEngine::with_options(store.clone(), remote, options);

        Ok(Self {
            config,
            store,
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SearchMode;

    #[test]
    fn test_context_opens_configured_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.db_path = Some(dir.path().join("nested").join("cache.db"));
        config.store.search = SearchMode::Indexed;

        let ctx = AppContext::new(config).unwrap();
        assert_eq!(ctx.store.search_mode(), SearchMode::Indexed);
        assert!(ctx.engine.list_cached(10).unwrap().is_empty());
        assert_eq!(ctx.engine.last_synced_at().unwrap(), None);
    }

    #[test]
    fn test_context_rejects_bad_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.remote.base_url = "not a url".into();

        let result = AppContext::with_db_path(config, &dir.path().join("cache.db"));
        assert!(matches!(result, Err(SyncError::RemoteFetch { .. })));
    }
}
