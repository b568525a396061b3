use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin PostgREST client. Every call is a single HTTP request, so each
/// write it issues is atomic for the rows it touches.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, return_representation: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // The service talks to the database as the anon role; row level
        // policies on the appointments table decide what that role may touch.
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.anon_key))?,
        );

        if return_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    /// Issue a request and decode the JSON response body.
    ///
    /// Writes (`POST`, `PATCH`, `DELETE`) ask PostgREST to echo the affected rows back.
    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let wants_rows = method == Method::POST || method == Method::PATCH || method == Method::DELETE;
        let text = self.send(method, path, body, wants_rows).await?;

        let data = serde_json::from_str::<T>(&text)
            .map_err(|e| anyhow!("Failed to decode response from {}: {}", path, e))?;
        Ok(data)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        return_representation: bool,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(return_representation)?;

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("API error ({}): {}", status, text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", text),
                404 => anyhow!("Resource not found: {}", text),
                409 => anyhow!("Write conflict: {}", text),
                _ => anyhow!("API error ({}): {}", status, text),
            });
        }

        Ok(text)
    }
}
