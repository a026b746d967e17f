use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::config::ClientConfig;

/// Status and fully-read body of one GET.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The read-only HTTP surface the scanner needs. Errors are transport failures only;
/// non-success status codes come back as a normal response.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// GET `url` and return only the status code; the body is discarded.
    async fn probe_status(&self, url: &str) -> anyhow::Result<u16>;

    /// GET `url` and read the whole body.
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse>;
}

#[async_trait]
impl BlobTransport for Client {
    async fn probe_status(&self, url: &str) -> anyhow::Result<u16> {
        let resp = self.get(url).send().await?;
        Ok(resp.status().as_u16())
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse> {
        let resp = self.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.context("failed to read response body")?;
        Ok(FetchResponse { status, body: body.to_vec() })
    }
}

/// Shared client for every probe task; connection pooling applies globally.
pub fn create_client(cfg: &ClientConfig) -> anyhow::Result<Client> {
    ClientBuilder::new()
        .pool_max_idle_per_host(cfg.max_idle_per_host)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .tcp_nodelay(true)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .gzip(true)
        .use_rustls_tls()
        .danger_accept_invalid_certs(cfg.skip_tls_verify)
        .user_agent(concat!("blob_hunter/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}
