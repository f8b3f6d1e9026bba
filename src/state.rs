use std::sync::Arc;

use anyhow::Context;
use bookreview_authz::TokenSigner;
use bookreview_db::{RatingStore, Store};
use bookreview_kernel::settings::{PaginationSettings, Settings};
use time::Duration;

use crate::modules::reviews::{aggregator::RatingAggregator, service::ReviewService};

/// Shared handles given to every module router.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub reviews: ReviewService,
    pub signer: TokenSigner,
    pub pagination: PaginationSettings,
}

impl AppState {
    /// Wire a single store for both the collections and the aggregator.
    pub fn new<S: Store + 'static>(store: Arc<S>, settings: &Settings) -> anyhow::Result<Self> {
        let rating_store: Arc<dyn RatingStore> = store.clone();
        Self::from_parts(store, rating_store, settings)
    }

    /// Wire the aggregator to its own rating store, e.g. a fault-injecting one.
    pub fn from_parts(
        store: Arc<dyn Store>,
        rating_store: Arc<dyn RatingStore>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let ttl = i64::try_from(settings.auth.token_ttl_secs)
            .context("auth.token_ttl_secs is out of range")?;
        let signer = TokenSigner::new(&settings.auth.jwt_secret, Duration::seconds(ttl))
            .context("auth.jwt_secret must be set (BOOKREVIEW_AUTH__JWT_SECRET)")?;

        let aggregator = RatingAggregator::new(rating_store);
        let reviews = ReviewService::new(store.clone(), aggregator);

        Ok(Self {
            store,
            reviews,
            signer,
            pagination: settings.pagination,
        })
    }
}
