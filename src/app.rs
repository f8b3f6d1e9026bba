use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookreview_db::{MemoryStore, MongoStore, Store};
use bookreview_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::state::AppState;

/// The assembled service: settings, shared state and the registered modules.
pub struct Application {
    settings: Settings,
    state: AppState,
    registry: ModuleRegistry,
}

impl Application {
    /// Backed by MongoDB when `database.uri` is set, otherwise by a fresh
    /// in-memory store.
    pub async fn connect(settings: Settings) -> anyhow::Result<Self> {
        let Some(uri) = settings.database.uri().map(str::to_owned) else {
            tracing::warn!("database.uri is not set; data will not survive a restart");
            return Self::new(settings);
        };

        let store = MongoStore::connect(&uri, &settings.database.name)
            .await
            .with_context(|| format!("failed to connect to database '{}'", settings.database.name))?;
        Self::with_store(settings, Arc::new(store))
    }

    /// Backed by a fresh in-memory store.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        Self::with_store(settings, Arc::new(MemoryStore::new()))
    }

    pub fn with_store<S: Store + 'static>(settings: Settings, store: Arc<S>) -> anyhow::Result<Self> {
        let state = AppState::new(store, &settings)?;
        Self::from_state(settings, state)
    }

    pub fn from_state(settings: Settings, state: AppState) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &state).context("failed to register modules")?;

        Ok(Self {
            settings,
            state,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run every module's `init` then `start` hook.
    pub async fn init(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            store: &self.state.store,
        };
        self.registry.init_modules(&ctx).await?;
        self.registry.start_modules(&ctx).await?;

        tracing::info!(modules = self.registry.module_count(), "application initialized");
        Ok(())
    }

    pub fn router(&self) -> Router {
        bookreview_http::build_router(&self.registry, &self.settings)
    }

    /// Initialize, serve until shutdown, then stop modules in reverse order.
    pub async fn run(self) -> anyhow::Result<()> {
        self.init().await?;

        let served = bookreview_http::start_server(&self.registry, &self.settings).await;
        if let Err(e) = self.registry.stop_modules().await {
            tracing::error!(error = %e, "module shutdown failed");
        }

        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "app-test-secret".to_string();
        settings
    }

    #[test]
    fn registers_every_feature_module() {
        let app = Application::new(settings()).unwrap();

        for name in ["auth", "users", "books", "reviews"] {
            assert!(app.registry().get_module(name).is_some(), "missing {name}");
        }
        assert_eq!(app.registry().module_count(), 4);
    }

    #[tokio::test]
    async fn connect_without_database_uri_uses_memory() {
        let app = Application::connect(settings()).await.unwrap();
        assert_eq!(app.registry().module_count(), 4);
    }

    #[tokio::test]
    async fn unreachable_database_fails_startup() {
        let mut settings = settings();
        settings.database.uri = Some("not-a-mongodb-uri".to_string());

        let err = Application::connect(settings).await.err().unwrap();
        assert!(format!("{err:#}").contains("failed to connect to database 'bookreview'"));
    }

    #[test]
    fn missing_jwt_secret_fails_startup() {
        let err = Application::new(Settings::default()).err().unwrap();
        assert!(format!("{err:#}").contains("jwt_secret"));
    }
}
