//! Core HTTP client for the MMLink backend API

use std::sync::RwLock;

use compact_str::{CompactString, ToCompactString, format_compact};
use itertools::Itertools;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{
    config::{ClientConfig, MessageQuery, UserQuery},
    error::{ClientError, Result},
};
use crate::{
    domain::{
        BroadcastOutcome, BroadcastRequest, CreateMessageRequest, CreateUserRequest, HealthStatus,
        MessageDto, MessageResponse, MessagesResponse, OverviewStats, StatsResponse, UpdateUserRequest,
        UserDto, UserPage, UserResponse, WebhookSetupOutcome,
    },
    id::UserId,
};

/// Pure HTTP client for the MMLink backend API
///
/// Every call goes through [`BackendApi::request`], which normalizes
/// timeouts, transport failures, and error bodies into [`ClientError`] so
/// nothing reqwest-shaped leaks to callers.
#[derive(Debug)]
pub struct BackendApi {
    client: RwLock<Client>,
    config: RwLock<ClientConfig>,
}

impl BackendApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Self::build_client(&config)?;

        Ok(Self {
            client: RwLock::new(client),
            config: RwLock::new(config),
        })
    }

    fn build_client(config: &ClientConfig) -> Result<Client> {
        Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(ClientError::from)
    }

    /// Probe backend health
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let status: HealthStatus = self.get_json("/api/health").await?;
        debug!(status = %status.status, "Backend health probed");
        Ok(status)
    }

    /// Get a page of bot users
    #[instrument(skip(self), fields(limit = ?query.limit, offset = ?query.offset))]
    pub async fn get_users(&self, query: &UserQuery) -> Result<UserPage> {
        let url = self.build_users_url(query);
        let page: UserPage = self.get_json(&url).await?;
        debug!(
            user_count = page.users.len(),
            total = page.total,
            "Fetched users"
        );
        Ok(page)
    }

    /// Get a single user account
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: &UserId) -> Result<UserDto> {
        let url = format_compact!("/api/users/{id}");
        let response: UserResponse = self.get_json(&url).await?;
        Ok(response.user)
    }

    /// Register a new user account
    #[instrument(skip(self, request), fields(platform = %request.platform))]
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserDto> {
        let response: UserResponse = self.post_json("/api/users", request).await?;
        debug!(user_id = %response.user.id, "Created user");
        Ok(response.user)
    }

    /// Apply a partial update to a user account
    #[instrument(skip(self, request), fields(user_id = %id))]
    pub async fn update_user(&self, id: &UserId, request: &UpdateUserRequest) -> Result<UserDto> {
        let url = format_compact!("/api/users/{id}");
        let response: UserResponse = self.put_json(&url, request).await?;
        Ok(response.user)
    }

    /// Get the global message feed, newest first
    #[instrument(skip(self), fields(limit = ?query.limit))]
    pub async fn get_messages(&self, query: &MessageQuery) -> Result<Vec<MessageDto>> {
        let url = self.build_messages_url("/api/messages", query);
        let response: MessagesResponse = self.get_json(&url).await?;
        debug!(
            message_count = response.messages.len(),
            "Fetched messages"
        );
        Ok(response.messages)
    }

    /// Get the conversation feed for one user
    #[instrument(skip(self), fields(user_id = %user_id, limit = ?query.limit))]
    pub async fn get_user_messages(
        &self,
        user_id: &UserId,
        query: &MessageQuery,
    ) -> Result<Vec<MessageDto>> {
        let path = format_compact!("/api/messages/user/{user_id}");
        let url = self.build_messages_url(&path, query);
        let response: MessagesResponse = self.get_json(&url).await?;
        Ok(response.messages)
    }

    /// Record an outbound or inbound message
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_message(&self, request: &CreateMessageRequest) -> Result<MessageDto> {
        let response: MessageResponse = self.post_json("/api/messages", request).await?;
        Ok(response.message)
    }

    /// Send a broadcast to all users, optionally scoped to one platform
    #[instrument(skip(self, request))]
    pub async fn broadcast_message(&self, request: &BroadcastRequest) -> Result<BroadcastOutcome> {
        let outcome: BroadcastOutcome = self.post_json("/api/bot/broadcast", request).await?;
        info!(success = outcome.success, "Broadcast submitted");
        Ok(outcome)
    }

    /// Get aggregated statistics for the overview dashboard
    #[instrument(skip(self))]
    pub async fn get_overview_stats(&self) -> Result<OverviewStats> {
        let response: StatsResponse = self.get_json("/api/stats/overview").await?;
        Ok(response.stats)
    }

    /// Register platform webhooks with Viber and Telegram
    #[instrument(skip(self))]
    pub async fn setup_webhooks(&self) -> Result<WebhookSetupOutcome> {
        let outcome: WebhookSetupOutcome = self
            .request(Method::POST, "/api/webhooks/setup", None::<&()>, &[])
            .await?;
        info!(success = outcome.success, "Webhook setup finished");
        Ok(outcome)
    }

    /// Set the bearer token used for subsequent requests
    pub fn set_token(&self, token: impl Into<CompactString>) {
        self.config.write().unwrap().auth_token = Some(token.into());
    }

    /// Remove the bearer token
    pub fn clear_token(&self) {
        self.config.write().unwrap().auth_token = None;
    }

    /// Update configuration, rebuilding the underlying client
    pub fn update_config(&self, config: ClientConfig) -> Result<()> {
        config.validate()?;
        let client = Self::build_client(&config)?;

        *self.config.write().unwrap() = config;
        *self.client.write().unwrap() = client;

        Ok(())
    }

    /// Get current configuration
    pub fn config(&self) -> ClientConfig {
        self.config.read().unwrap().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .read()
            .map(|c| c.validate().is_ok())
            .unwrap_or(false)
    }

    /// Issue one request against the backend and normalize the outcome
    ///
    /// `endpoint` may be absolute or relative to the configured base URL.
    /// The request always carries `Content-Type: application/json` and the
    /// bearer token when one is configured; caller-supplied `headers` win
    /// over both on conflict. An empty success body is read as JSON `null`
    /// so `Option<_>`-shaped payload types can accept it.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let url = self.resolve_url(endpoint);
        let request = self.build_request(method, &url, body, headers)?;
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Perform a GET request and deserialize the JSON response
    async fn get_json<T>(&self, endpoint: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.request(Method::GET, endpoint, None::<&()>, &[]).await
    }

    /// Perform a POST request with a JSON body
    async fn post_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, Some(body), &[]).await
    }

    /// Perform a PUT request with a JSON body
    async fn put_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, endpoint, Some(body), &[]).await
    }

    /// Create a request builder with default headers and optional body
    ///
    /// Kept synchronous so the config and client read guards are released
    /// before the request future is awaited.
    fn build_request<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> Result<RequestBuilder>
    where
        B: Serialize + ?Sized,
    {
        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.config.read().unwrap().auth_token.clone() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::unknown(format_compact!("Invalid token header: {e}")))?;
            header_map.insert(AUTHORIZATION, value);
        }

        // insert() replaces, so caller headers override the defaults
        for (name, value) in headers {
            let parsed_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::unknown(format_compact!("Invalid header name {name}: {e}"))
            })?;
            let parsed_value = HeaderValue::from_str(value).map_err(|e| {
                ClientError::unknown(format_compact!("Invalid header value for {name}: {e}"))
            })?;
            header_map.insert(parsed_name, parsed_value);
        }

        let client = self.client.read().unwrap();
        let mut request = client.request(method, url).headers(header_map);

        if let Some(body) = body {
            let payload = serde_json::to_string(body).map_err(|e| {
                ClientError::unknown(format_compact!("Failed to encode request body: {e}"))
            })?;
            request = request.body(payload);
        }

        Ok(request)
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let endpoint = CompactString::from(response.url().path());
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            // An empty success body reads as JSON null
            let payload = if body.trim().is_empty() { "null" } else { body.as_str() };
            serde_json::from_str(payload).map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "Failed to parse response body");
                ClientError::parse(endpoint, e.to_compact_string())
            })
        } else {
            Err(self.error_from_response(status, &body))
        }
    }

    /// Derive the error for a non-success response
    ///
    /// The message is mined from the body in order: JSON `error.message`,
    /// JSON `message`, the raw text when the body is not JSON, and finally
    /// the status line. An empty string falls through to the next source.
    fn error_from_response(&self, status: StatusCode, body: &str) -> ClientError {
        let fallback = || {
            format_compact!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        };

        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(payload) => payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .or_else(|| {
                    payload
                        .get("message")
                        .and_then(|m| m.as_str())
                        .filter(|m| !m.is_empty())
                })
                .map(CompactString::from)
                .unwrap_or_else(fallback),
            Err(_) if !body.trim().is_empty() => body.trim().into(),
            Err(_) => fallback(),
        };

        ClientError::http(status.as_u16(), message)
    }

    /// Resolve an endpoint against the configured base URL
    fn resolve_url(&self, endpoint: &str) -> CompactString {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.into()
        } else {
            let config = self.config.read().unwrap();
            format_compact!("{}{}", config.base_url, endpoint)
        }
    }

    /// Build URL for the user listing endpoint
    fn build_users_url(&self, query: &UserQuery) -> CompactString {
        let mut url = CompactString::from("/api/users");

        let mut params = Vec::new();
        if let Some(limit) = query.limit {
            params.push(format_compact!("limit={limit}"));
        }
        if let Some(offset) = query.offset {
            params.push(format_compact!("offset={offset}"));
        }
        if let Some(platform) = query.platform {
            params.push(format_compact!("platform={platform}"));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.iter().join("&"));
        }

        url
    }

    /// Build URL for a message feed endpoint
    fn build_messages_url(&self, base_path: &str, query: &MessageQuery) -> CompactString {
        match query.limit {
            Some(limit) => format_compact!("{base_path}?limit={limit}"),
            None => base_path.into(),
        }
    }
}
