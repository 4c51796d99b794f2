use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::streak_service::StreakService;

/// Assembles the portal services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    streaks: Arc<StreakService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::debug!(db_url, "sqlite storage ready");
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let catalog = CatalogService::new(Arc::clone(&storage.questions));
        let progress = Arc::new(ProgressService::new(
            clock,
            catalog.clone(),
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.completions),
        ));
        let streaks = Arc::new(StreakService::new(
            clock,
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.streaks),
        ));

        Self {
            storage,
            catalog: Arc::new(catalog),
            progress,
            streaks,
        }
    }

    /// Raw repositories, for seeding and admin tooling.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn streaks(&self) -> Arc<StreakService> {
        Arc::clone(&self.streaks)
    }
}
