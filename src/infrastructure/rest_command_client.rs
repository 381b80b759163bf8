// REST adapter for the backend command API
use crate::application::command_port::CommandPort;
use crate::domain::device::{DeviceId, Quantity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct RestCommandClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestCommandClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn device_url(&self, device: &DeviceId, action: &str) -> String {
        format!(
            "{}/devices/{}/{}",
            self.base_url,
            urlencoding::encode(device.as_str()),
            action
        )
    }

    async fn post(&self, url: &str, body: Option<serde_json::Value>) -> Result<()> {
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach command API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("command API returned {}: {}", status, body);
        }

        Ok(())
    }
}

#[async_trait]
impl CommandPort for RestCommandClient {
    async fn issue_command(
        &self,
        device: &DeviceId,
        quantity: Quantity,
        value: f64,
    ) -> Result<()> {
        let url = self.device_url(device, "commands");
        self.post(
            &url,
            Some(json!({ "quantity": quantity.as_str(), "value": value })),
        )
        .await
    }

    async fn connect(&self, device: &DeviceId) -> Result<()> {
        let url = self.device_url(device, "connect");
        self.post(&url, None).await
    }

    async fn disconnect(&self, device: &DeviceId) -> Result<()> {
        let url = self.device_url(device, "disconnect");
        self.post(&url, None).await
    }
}
