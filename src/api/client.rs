use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::error::{NestPayError, Result};

const APPROVED_MARKER: &str = "<ProcReturnCode>00</ProcReturnCode>";

/// Client for the gateway's synchronous XML API (`CC5Request`).
///
/// One attempt per call, no automatic retry: a transport failure surfaces
/// as [`NestPayError::Transport`], a declined response as `Ok(false)`.
pub struct CaptureVoidClient {
    http: Client,
    config: Arc<Config>,
}

impl CaptureVoidClient {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(host) = &config.proxy_host {
            let port = config.proxy_port.unwrap_or(80);
            let proxy = reqwest::Proxy::all(format!("http://{}:{}", host, port))
                .map_err(|e| NestPayError::Transport(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| NestPayError::Transport(format!("building http client: {}", e)))?;
        Ok(CaptureVoidClient { http, config })
    }

    /// Issue a `PostAuth` (capture) or `Void` call for the order and report
    /// whether the gateway approved it.
    pub async fn capture_or_void(&self, oid: &str, void: bool) -> Result<bool> {
        let operation = if void { "Void" } else { "PostAuth" };
        let request = self.xml_request(operation, oid)?;
        let url = self.config.api_url();
        info!(
            oid,
            operation,
            url,
            request = %request.replace('\n', ""),
            "calling capture/void API"
        );

        let response = self
            .http
            .post(url)
            .form(&[("DATA", request.as_str())])
            .send()
            .await
            .map_err(|e| {
                NestPayError::Transport(format!("capture/void failed posting for {}: {}", oid, e))
            })?;
        let body = response.text().await.map_err(|e| {
            NestPayError::Transport(format!("capture/void failed reading response for {}: {}", oid, e))
        })?;
        info!(oid, operation, response = %body.replace('\n', ""), "capture/void response");

        Ok(body.contains(APPROVED_MARKER))
    }

    fn xml_request(&self, operation: &str, oid: &str) -> Result<String> {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CC5Request>\n");
        xml.push_str(&format!("  <Name>{}</Name>\n", self.config.api_user()?));
        xml.push_str(&format!("  <Password>{}</Password>\n", self.config.api_pass()?));
        xml.push_str(&format!("  <ClientId>{}</ClientId>\n", self.config.merchant_id()?));
        xml.push_str(&format!("  <Type>{}</Type>\n", operation));
        xml.push_str(&format!("  <OrderId>{}</OrderId>\n", oid));
        xml.push_str("</CC5Request>");
        Ok(xml)
    }
}
