use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use dcimsync_inventory::{Criteria, Endpoint, InventoryClient, InventoryError, RemoteEntity};

use crate::config::NetBoxConfig;

/// NetBox REST client.
///
/// Every call is a single request except list queries, which follow the
/// `next` links until the last page.
pub struct NetBoxClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl NetBoxClient {
    pub fn new(
        base_url: &str,
        token: &str,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self, InventoryError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &NetBoxConfig) -> Result<Self, InventoryError> {
        Self::new(
            &config.url,
            &config.token,
            config.verify_tls,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn api_url(&self, endpoint: Endpoint) -> String {
        format!("{}/api/{}/", self.base_url, endpoint.path())
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        req: reqwest::RequestBuilder,
    ) -> Result<Value, InventoryError> {
        let resp = req
            .send()
            .await
            .map_err(|e| InventoryError::connection(format!("{endpoint}: {e}")))?;
        handle_response(endpoint, resp).await
    }

    async fn list(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Vec<RemoteEntity>, InventoryError> {
        let pairs: Vec<(&str, &str)> = criteria.iter().collect();
        debug!(%endpoint, %criteria, "Listing");

        let first = self.request(reqwest::Method::GET, &self.api_url(endpoint)).query(&pairs);
        let mut page = self.send(endpoint, first).await?;
        let mut entities = Vec::new();
        loop {
            let results = page
                .get_mut("results")
                .map(Value::take)
                .and_then(|v| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| {
                    InventoryError::invalid_response(format!(
                        "{endpoint}: list response has no results array"
                    ))
                })?;
            for item in results {
                entities.push(RemoteEntity::from_value(item)?);
            }

            let Some(next) = page.get("next").and_then(Value::as_str).map(str::to_string) else {
                break;
            };
            debug!(%endpoint, next = %next, "Following page");
            page = self
                .send(endpoint, self.request(reqwest::Method::GET, &next))
                .await?;
        }
        Ok(entities)
    }
}

#[async_trait]
impl InventoryClient for NetBoxClient {
    async fn get(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Option<RemoteEntity>, InventoryError> {
        let mut found = self.list(endpoint, criteria).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(InventoryError::multiple_results(endpoint.path(), count)),
        }
    }

    async fn filter(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Vec<RemoteEntity>, InventoryError> {
        self.list(endpoint, criteria).await
    }

    async fn create(
        &self,
        endpoint: Endpoint,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError> {
        let req = self
            .request(reqwest::Method::POST, &self.api_url(endpoint))
            .json(payload);
        RemoteEntity::from_value(self.send(endpoint, req).await?)
    }

    async fn update(
        &self,
        endpoint: Endpoint,
        id: u64,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError> {
        let url = format!("{}{id}/", self.api_url(endpoint));
        let req = self.request(reqwest::Method::PATCH, &url).json(payload);
        RemoteEntity::from_value(self.send(endpoint, req).await?)
    }

    fn backend_name(&self) -> &'static str {
        "netbox"
    }
}

async fn handle_response(
    endpoint: Endpoint,
    resp: reqwest::Response,
) -> Result<Value, InventoryError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| InventoryError::connection(format!("{endpoint}: {e}")))?;

    if !status.is_success() {
        return Err(InventoryError::rejected(
            endpoint.path(),
            status.as_u16(),
            summarize_error(&body),
        ));
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| {
        InventoryError::invalid_response(format!("{endpoint}: failed to parse response JSON: {e}"))
    })
}

/// NetBox answers errors either as `{"detail": "..."}` or as a map of field
/// name to messages.
fn summarize_error(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    if let Some(detail) = json.get("detail").and_then(Value::as_str) {
        return detail.to_string();
    }
    match json {
        Value::Object(fields) if !fields.is_empty() => fields
            .iter()
            .map(|(field, messages)| {
                let text = match messages {
                    Value::Array(items) => items
                        .iter()
                        .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                        .collect::<Vec<_>>()
                        .join(" "),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{field}: {text}")
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_field_errors() {
        let body = r#"{"slug": ["device type with this slug already exists."], "u_height": ["Ensure this value is >= 0."]}"#;
        assert_eq!(
            summarize_error(body),
            "slug: device type with this slug already exists.; u_height: Ensure this value is >= 0."
        );
    }

    #[test]
    fn summarizes_detail_and_plain_bodies() {
        assert_eq!(
            summarize_error(r#"{"detail": "Invalid token"}"#),
            "Invalid token"
        );
        assert_eq!(summarize_error("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn builds_api_urls_without_double_slash() {
        let client =
            NetBoxClient::new("https://netbox.local/", "t", true, Duration::from_secs(5))
                .expect("client");
        assert_eq!(
            client.api_url(Endpoint::Manufacturers),
            "https://netbox.local/api/dcim/manufacturers/"
        );
    }
}
