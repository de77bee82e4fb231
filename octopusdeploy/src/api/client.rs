use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tfplug::Sensitive;
use url::Url;

use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

/// Octopus Deploy API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Sensitive<String>,
    space_id: Option<String>,
    retry_config: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &self.inner.api_key)
            .field("space_id", &self.inner.space_id)
            .finish()
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(
        address: &str,
        api_key: &str,
        space_id: Option<&str>,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        Self::with_config(address, api_key, space_id, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        address: &str,
        api_key: &str,
        space_id: Option<&str>,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let url = Url::parse(address).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", address, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                address
            )));
        }

        if api_key.trim().is_empty() {
            return Err(ApiError::InvalidParameter("api_key must not be empty".into()));
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let base_url = url.as_str().trim_end_matches('/').to_string();
        let space_id = space_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        tracing::debug!(base_url = %base_url, space_id = ?space_id, "created Octopus Deploy client");

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                api_key: Sensitive::new(api_key.to_string()),
                space_id,
                retry_config,
            }),
        })
    }

    pub fn space_id(&self) -> Option<&str> {
        self.inner.space_id.as_deref()
    }

    /// Path of a collection endpoint, scoped to the configured space when set
    pub fn collection_path(&self, collection: &str) -> String {
        match &self.inner.space_id {
            Some(space) => format!("/api/{}/{}", space, collection),
            None => format!("/api/{}", collection),
        }
    }

    /// Certificates API operations
    pub fn certificates(&self) -> crate::api::certificates::CertificatesApi<'_> {
        crate::api::certificates::CertificatesApi::new(self)
    }

    /// Library variable set API operations
    pub fn library_variable_sets(
        &self,
    ) -> crate::api::library_variable_sets::LibraryVariableSetsApi<'_> {
        crate::api::library_variable_sets::LibraryVariableSetsApi::new(self)
    }

    /// Deployment target API operations
    pub fn machines(&self) -> crate::api::machines::MachinesApi<'_> {
        crate::api::machines::MachinesApi::new(self)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        self.inner
            .http_client
            .request(method, url)
            .header(API_KEY_HEADER, self.inner.api_key.expose())
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(|| self.request(Method::GET, path).send(), path, true)
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request. Creates are not idempotent and are never retried.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(
                || self.request(Method::POST, path).json(body).send(),
                path,
                false,
            )
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(
                || self.request(Method::PUT, path).json(body).send(),
                path,
                true,
            )
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a DELETE request with retry logic. The response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_with_retry(|| self.request(Method::DELETE, path).send(), path, true)
            .await?;
        Ok(())
    }

    /// Execute request with retry logic, returning the successful response
    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
        retryable: bool,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let max_retries = if retryable {
            self.inner.retry_config.max_retries
        } else {
            0
        };
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(ApiError::AuthError(status.as_u16()));
                    }

                    if status == StatusCode::NOT_FOUND {
                        return Err(ApiError::NotFound(path.to_string()));
                    }

                    if retryable && status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if retryable && status.is_server_error() {
                        last_error = Some(self.error_from_response(response).await);
                    } else {
                        return Err(self.error_from_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::RequestError(e));
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}", e);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Build an error from a non-success response
    async fn error_from_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => ApiError::ApiError {
                status,
                message: err_resp.full_message(),
                details: Some(Box::new(ApiErrorDetails {
                    errors: err_resp.errors,
                })),
            },
            Err(_) => ApiError::ApiError {
                status,
                message: text,
                details: None,
            },
        }
    }
}
