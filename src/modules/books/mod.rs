//! Book catalog: CRUD, filtering and statistics.

pub mod filters;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod routes;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_kernel::{settings::ApiSettings, InitCtx, Module};
use utoipa::openapi::OpenApi;

use handlers::BooksState;
use store::SharedStore;

pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(store: SharedStore, api: ApiSettings) -> Self {
        Self {
            state: BooksState { store, api },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.state.store.count().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books,
            page_size = self.state.api.page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone()).0
    }

    fn openapi(&self) -> Option<OpenApi> {
        Some(routes::router(self.state.clone()).1)
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over the given store
pub fn create_module(store: SharedStore, api: ApiSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, api))
}
