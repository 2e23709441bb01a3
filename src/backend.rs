//! HTTP client for the boat tracker API

use std::future::Future;
use std::sync::Arc;

use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    auth::{SharedToken, TokenProvider},
    config::BackendConfig,
    errors::BoatTrackerError,
    models::{
        ApiErrors, BoatInfo, BoatRename, Coord, DeviceType, LanguageChange, Profile,
        PushRegistration, ShortestRoute, ShortestRouteRequest, Stats, TrackRef,
    },
};

pub const ACCEPT_V2: &str = "application/vnd.boat.v2+json";
pub const CSRF_HEADER: &str = "Csrf-Token";
pub const CSRF_NOCHECK: &str = "nocheck";

/// Run `request` with the current token. If the backend reports an expired
/// token, refresh it once through `provider`, store it in `token` and retry.
/// The result of the retry is final.
pub async fn with_token_refresh<T, F, Fut>(
    token: &RwLock<Option<String>>,
    provider: &dyn TokenProvider,
    mut request: F,
) -> Result<T, BoatTrackerError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<T, BoatTrackerError>>,
{
    let current = token.read().await.clone();
    match request(current).await {
        Err(e) if e.is_token_expired() => {
            info!("Access token expired, refreshing");
            let fresh = provider.refresh_silently().await?;
            *token.write().await = Some(fresh.clone());
            request(Some(fresh)).await
        }
        result => result,
    }
}

/// Build the error for a non-2xx response body
pub fn api_failure(status: StatusCode, body: &str) -> BoatTrackerError {
    let errors = match serde_json::from_str::<ApiErrors>(body) {
        Ok(parsed) => parsed.errors,
        Err(_) => {
            debug!("Unstructured error body for status {}", status);
            Vec::new()
        }
    };
    BoatTrackerError::Http {
        status: status.as_u16(),
        errors,
    }
}

pub struct BackendClient {
    http: Client,
    api_url: String,
    token: SharedToken,
    auth: Arc<dyn TokenProvider>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig, auth: Arc<dyn TokenProvider>) -> Result<Self, BoatTrackerError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            auth,
        })
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Handle on the token this client keeps current, for the socket loop
    pub fn token_source(&self) -> SharedToken {
        Arc::clone(&self.token)
    }

    /// Request with the fixed API headers
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, ACCEPT_V2);
        if method != Method::GET {
            builder = builder.header(CSRF_HEADER, CSRF_NOCHECK);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    async fn check(response: Response) -> Result<Response, BoatTrackerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = api_failure(status, &body);
        warn!("Request failed with status {}", status);
        Err(error)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BoatTrackerError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), BoatTrackerError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BoatTrackerError> {
        debug!("GET {}", path);
        with_token_refresh(&self.token, self.auth.as_ref(), move |token| async move {
            Self::send_json(self.request(Method::GET, path, token.as_deref())).await
        })
        .await
    }

    async fn send_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, BoatTrackerError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, path);
        with_token_refresh(&self.token, self.auth.as_ref(), |token| {
            let builder = self.request(method.clone(), path, token.as_deref()).json(body);
            Self::send_json(builder)
        })
        .await
    }

    async fn send_body_empty<B>(&self, method: Method, path: &str, body: &B) -> Result<(), BoatTrackerError>
    where
        B: Serialize + Sync,
    {
        debug!("{} {}", method, path);
        with_token_refresh(&self.token, self.auth.as_ref(), |token| {
            let builder = self.request(method.clone(), path, token.as_deref()).json(body);
            Self::send_empty(builder)
        })
        .await
    }

    pub async fn profile(&self) -> Result<Profile, BoatTrackerError> {
        self.get("users/me").await
    }

    pub async fn tracks(&self) -> Result<Vec<TrackRef>, BoatTrackerError> {
        self.get("tracks").await
    }

    pub async fn stats(&self) -> Result<Stats, BoatTrackerError> {
        self.get("stats").await
    }

    pub async fn rename_boat(&self, name: &str) -> Result<BoatInfo, BoatTrackerError> {
        let body = BoatRename {
            boat_name: name.to_string(),
        };
        self.send_body(Method::PUT, "boats", &body).await
    }

    pub async fn register_push(&self, token: &str, device: DeviceType) -> Result<(), BoatTrackerError> {
        let body = PushRegistration {
            token: token.to_string(),
            device,
        };
        self.send_body_empty(Method::POST, "users/notifications", &body)
            .await
    }

    pub async fn deregister_push(&self, token: &str, device: DeviceType) -> Result<(), BoatTrackerError> {
        let body = PushRegistration {
            token: token.to_string(),
            device,
        };
        self.send_body_empty(Method::DELETE, "users/notifications", &body)
            .await
    }

    pub async fn change_language(&self, language: &str) -> Result<(), BoatTrackerError> {
        let body = LanguageChange {
            language: language.to_string(),
        };
        self.send_body_empty(Method::PUT, "users/me/language", &body)
            .await
    }

    pub async fn shortest_route(&self, from: Coord, to: Coord) -> Result<ShortestRoute, BoatTrackerError> {
        self.send_body(Method::POST, "routes/shortest", &ShortestRouteRequest { from, to })
            .await
    }
}
