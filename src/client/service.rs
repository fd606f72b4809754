//! High-level bindings between backend resources and watchers

use std::sync::Arc;

use tracing::debug;

use super::{
    api::BackendApi,
    config::{ClientConfig, MessageQuery, UserQuery, WatchOptions},
    watcher::Watcher,
};
use crate::{
    domain::{HealthStatus, MessageDto, OverviewStats, UserPage},
    id::UserId,
};

/// Factory for the standard resource watchers
///
/// Each `watch_*` method binds one backend resource to a [`Watcher`] that
/// fetches immediately and then refreshes at the cadence configured in
/// [`super::config::PollingConfig`].
#[derive(Debug, Clone)]
pub struct BackendService {
    api: Arc<BackendApi>,
}

impl BackendService {
    /// Create service from an existing API client
    pub fn new(api: Arc<BackendApi>) -> Self {
        Self { api }
    }

    /// Reference to the underlying API client
    pub fn api(&self) -> &Arc<BackendApi> {
        &self.api
    }

    /// Watch the paginated user listing
    pub fn watch_users(&self, query: UserQuery) -> Watcher<UserPage> {
        let options = WatchOptions::poll(self.api.config().polling.users_interval);
        debug!(interval = ?options.refresh_interval, "Binding user listing watcher");

        let api = Arc::clone(&self.api);
        Watcher::spawn(
            move || {
                let api = Arc::clone(&api);
                let query = query.clone();
                async move { api.get_users(&query).await }
            },
            options,
        )
    }

    /// Watch the global message feed
    pub fn watch_messages(&self, query: MessageQuery) -> Watcher<Vec<MessageDto>> {
        let options = WatchOptions::poll(self.api.config().polling.messages_interval);
        debug!(interval = ?options.refresh_interval, "Binding message feed watcher");

        let api = Arc::clone(&self.api);
        Watcher::spawn(
            move || {
                let api = Arc::clone(&api);
                let query = query.clone();
                async move { api.get_messages(&query).await }
            },
            options,
        )
    }

    /// Watch one user's conversation feed
    ///
    /// Fetches once at startup and on explicit refetch; conversations are
    /// not polled automatically.
    pub fn watch_user_messages(
        &self,
        user_id: UserId,
        query: MessageQuery,
    ) -> Watcher<Vec<MessageDto>> {
        debug!(user_id = %user_id, "Binding conversation watcher");

        let api = Arc::clone(&self.api);
        Watcher::spawn(
            move || {
                let api = Arc::clone(&api);
                let user_id = user_id.clone();
                let query = query.clone();
                async move { api.get_user_messages(&user_id, &query).await }
            },
            WatchOptions::default(),
        )
    }

    /// Watch the overview statistics
    pub fn watch_overview_stats(&self) -> Watcher<OverviewStats> {
        let options = WatchOptions::poll(self.api.config().polling.stats_interval);
        debug!(interval = ?options.refresh_interval, "Binding statistics watcher");

        let api = Arc::clone(&self.api);
        Watcher::spawn(
            move || {
                let api = Arc::clone(&api);
                async move { api.get_overview_stats().await }
            },
            options,
        )
    }

    /// Watch backend health
    pub fn watch_health(&self) -> Watcher<HealthStatus> {
        let options = WatchOptions::poll(self.api.config().polling.health_interval);
        debug!(interval = ?options.refresh_interval, "Binding health watcher");

        let api = Arc::clone(&self.api);
        Watcher::spawn(
            move || {
                let api = Arc::clone(&api);
                async move { api.health_check().await }
            },
            options,
        )
    }

    /// Update client configuration
    pub fn update_config(&self, config: ClientConfig) -> super::error::Result<()> {
        self.api.update_config(config)
    }

    /// Get current client configuration
    pub fn config(&self) -> ClientConfig {
        self.api.config()
    }
}
