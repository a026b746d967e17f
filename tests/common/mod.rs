#![allow(dead_code)]

use async_trait::async_trait;
use blob_hunter::output::{report_channel, ReportMessage, ResultsMap};
use blob_hunter::{BlobTransport, ContainerProber, FetchResponse, ScanConfig, ScanTarget};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
pub enum Reply {
    Status(u16, String),
    Fail,
    Hang,
}

/// In-memory storage service keyed by exact request URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeStorage {
    routes: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.routes.insert(url.into(), reply);
        self
    }

    pub fn container(self, target: &ScanTarget) -> Self {
        let url = target.container_url();
        self.route(url, Reply::Status(200, String::new()))
    }

    pub fn page(self, target: &ScanTarget, marker: Option<&str>, xml: String) -> Self {
        let url = target.listing_url(marker);
        self.route(url, Reply::Status(200, xml))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn listing_calls(&self) -> usize {
        self.calls.lock().iter().filter(|u| u.contains("comp=list")).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn respond(&self, url: &str) -> anyhow::Result<FetchResponse> {
        self.calls.lock().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.routes.get(url).cloned().unwrap_or(Reply::Status(404, String::new()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Reply::Status(status, body) => Ok(FetchResponse { status, body: body.into_bytes() }),
            Reply::Fail => Err(anyhow::anyhow!("connection refused")),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl BlobTransport for FakeStorage {
    async fn probe_status(&self, url: &str) -> anyhow::Result<u16> {
        self.respond(url).await.map(|r| r.status)
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse> {
        self.respond(url).await
    }
}

/// Listing page in the current service shape: plain container name plus ServiceEndpoint.
pub fn listing_xml(account: &str, container: &str, blobs: &[(&str, u64)], next_marker: &str) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ServiceEndpoint="https://{}.blob.core.windows.net/" ContainerName="{}"><Blobs>"#,
        account, container
    );
    for (name, len) in blobs {
        xml.push_str(&format!(
            "<Blob><Name>{}</Name><Properties><Content-Length>{}</Content-Length></Properties></Blob>",
            name, len
        ));
    }
    xml.push_str("</Blobs>");
    if next_marker.is_empty() {
        xml.push_str("<NextMarker />");
    } else {
        xml.push_str(&format!("<NextMarker>{}</NextMarker>", next_marker));
    }
    xml.push_str("</EnumerationResults>");
    xml
}

pub fn prober(
    fake: Arc<FakeStorage>,
    cfg: &ScanConfig,
) -> (ContainerProber, Arc<ResultsMap>, mpsc::Receiver<ReportMessage>) {
    let results = Arc::new(ResultsMap::new());
    let (tx, rx) = report_channel();
    let transport: Arc<dyn BlobTransport> = fake;
    (ContainerProber::new(transport, results.clone(), tx, cfg), results, rx)
}

pub fn drain(rx: &mut mpsc::Receiver<ReportMessage>) -> Vec<ReportMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

pub fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
