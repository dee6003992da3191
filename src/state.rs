use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::database::{CredentialStore, DatabaseManager, MemoryStore, PgStore, RecordStore};
use crate::schema::Catalog;
use crate::storage::{AttachmentStore, DiskStore};

/// Everything a handler may touch, passed explicitly through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    pub records: Arc<dyn RecordStore>,
    pub principals: Arc<dyn CredentialStore>,
    pub attachments: Arc<dyn AttachmentStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let catalog = match &config.schema_file {
            Some(path) => {
                let catalog = Catalog::from_yaml_file(path)
                    .with_context(|| format!("loading schema file {}", path.display()))?;
                info!("Loaded {} entities from {}", catalog.entities.len(), path.display());
                catalog
            }
            None => Catalog::builtin(),
        };
        catalog.validate().context("validating entity catalog")?;
        info!("Serving resources: {}", catalog.names().collect::<Vec<_>>().join(", "));

        let attachments = Arc::new(DiskStore::new(config.uploads.root.clone())) as Arc<dyn AttachmentStore>;

        let (records, principals): (Arc<dyn RecordStore>, Arc<dyn CredentialStore>) = if config.database.url.is_some() {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.auto_migrate {
                DatabaseManager::migrate(&pool, &catalog).await?;
            }
            let store = Arc::new(PgStore::new(pool));
            (store.clone() as Arc<dyn RecordStore>, store as Arc<dyn CredentialStore>)
        } else if config.requires_database() {
            anyhow::bail!("DATABASE_URL must be set when APP_ENV=production");
        } else {
            warn!("DATABASE_URL not set; using the in-memory store, data will not survive a restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn RecordStore>, store as Arc<dyn CredentialStore>)
        };

        Ok(Self::from_parts(config, catalog, records, principals, attachments))
    }

    pub fn from_parts(
        config: AppConfig,
        catalog: Catalog,
        records: Arc<dyn RecordStore>,
        principals: Arc<dyn CredentialStore>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            records,
            principals,
            attachments,
        }
    }

    /// In-memory stores and a disk attachment store rooted at `upload_root`.
    pub fn in_memory(mut config: AppConfig, catalog: Catalog, upload_root: impl Into<PathBuf>) -> Self {
        config.uploads.root = upload_root.into();
        let store = Arc::new(MemoryStore::new());
        let attachments = Arc::new(DiskStore::new(config.uploads.root.clone()));
        Self::from_parts(config, catalog, store.clone(), store, attachments)
    }
}
