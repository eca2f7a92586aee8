//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{ClickRecorder, LinkService, Resolver, ResolverOptions};
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheService;

/// Explicitly constructed service handles; there are no global clients.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub resolver: Arc<Resolver>,
    pub click_recorder: ClickRecorder,
    pub link_repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
}

impl AppState {
    /// Wires the services over one durable store and one cache.
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        base_url: impl Into<String>,
        resolver_options: ResolverOptions,
    ) -> Self {
        let link_service = Arc::new(LinkService::new(link_repository.clone(), base_url));
        let resolver = Arc::new(Resolver::new(
            cache.clone(),
            link_repository.clone(),
            resolver_options,
        ));
        let click_recorder = ClickRecorder::new(cache.clone(), resolver_options.cache_timeout);

        Self {
            link_service,
            resolver,
            click_recorder,
            link_repository,
            cache,
        }
    }
}
