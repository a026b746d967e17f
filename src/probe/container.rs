use std::sync::Arc;

use crate::config::{PageLimit, ScanConfig};
use crate::http_client::BlobTransport;
use crate::listing::decode_page;
use crate::output::{ReportMessage, ReportSender, ResultsMap};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Responses below this status mean the container exists / the page was served.
const CLIENT_ERROR_THRESHOLD: u16 = 400;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    pub account: String,
    pub container: String,
}

impl ScanTarget {
    pub fn new(account: impl Into<String>, container: impl Into<String>) -> Self {
        Self { account: account.into(), container: container.into() }
    }

    /// `https://{account}.blob.core.windows.net/{container}?restype=container`
    pub fn container_url(&self) -> String {
        format!("https://{}.blob.core.windows.net/{}?restype=container", self.account, self.container)
    }

    /// Listing URL for one page; `marker` is only passed after the first page.
    pub fn listing_url(&self, marker: Option<&str>) -> String {
        let base = format!("{}&comp=list&showonly=files", self.container_url());
        match marker {
            Some(m) => format!("{}&marker={}", base, urlencoding::encode(m)),
            None => base,
        }
    }
}

/// How a single probe ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The existence check never got a response.
    Unreachable,
    /// The existence check answered with a client or server error.
    Missing { status: u16 },
    /// The container exists; `pages` listing pages were decoded and merged.
    Found { pages: u32, objects: u64 },
}

/// Resolves existence and content of one container in one account.
pub struct ContainerProber {
    transport: Arc<dyn BlobTransport>,
    results: Arc<ResultsMap>,
    reports: ReportSender,
    blobs_only: bool,
    max_pages: PageLimit,
}

impl ContainerProber {
    pub fn new(
        transport: Arc<dyn BlobTransport>,
        results: Arc<ResultsMap>,
        reports: ReportSender,
        cfg: &ScanConfig,
    ) -> Self {
        Self { transport, results, reports, blobs_only: cfg.blobs_only, max_pages: cfg.max_pages }
    }

    pub async fn scan(&self, target: &ScanTarget) -> ProbeOutcome {
        let container_url = target.container_url();

        let status = match self.transport.probe_status(&container_url).await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!("{}[-] Error while fetching URL: '{}'{}", RED, e, RESET);
                return ProbeOutcome::Unreachable;
            }
        };
        if status >= CLIENT_ERROR_THRESHOLD {
            tracing::trace!("{}[+][C={}] {}{}", RED, status, container_url, RESET);
            return ProbeOutcome::Missing { status };
        }

        self.results.merge(&target.account, &target.container, 0, 0);
        if !self.blobs_only {
            self.report(ReportMessage::new(
                format!("{}[+][C={}] {}{}", GREEN, status, container_url, RESET),
                container_url.clone(),
            ))
            .await;
        }

        let (pages, objects) = self.paginate(target).await;
        ProbeOutcome::Found { pages, objects }
    }

    /// Walk the listing until the cursor runs out, the page cap is hit, or a page fails.
    /// Pages merged before a failure stay merged.
    async fn paginate(&self, target: &ScanTarget) -> (u32, u64) {
        let mut marker: Option<String> = None;
        let mut page: u32 = 1;
        let mut decoded_pages = 0;
        let mut objects: u64 = 0;

        while self.max_pages.allows(page) {
            tracing::info!(
                "[~] Analyzing container '{}' in account '{}' (page {})",
                target.container,
                target.account,
                page
            );

            let url = target.listing_url(marker.as_deref());
            let resp = match self.transport.fetch(&url).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!("{}[-] Error while fetching URL: '{}'{}", RED, e, RESET);
                    break;
                }
            };
            if resp.status >= CLIENT_ERROR_THRESHOLD {
                tracing::debug!("{}[-] Error while accessing {}: status {}{}", RED, url, resp.status, RESET);
                break;
            }
            let listing = match decode_page(&resp.body) {
                Ok(l) => l,
                Err(e) => {
                    tracing::debug!("{}[-] Error while decoding {}: '{:#}'{}", RED, url, e, RESET);
                    break;
                }
            };

            let count = listing.object_count() as u64;
            self.results.merge(&target.account, &target.container, count, listing.total_content_length());
            objects += count;
            decoded_pages += 1;

            if self.blobs_only {
                for blob_url in listing.blob_urls() {
                    let msg = if blob_url.is_empty() {
                        // Nothing usable to persist; show it on the console only.
                        ReportMessage {
                            console: Some(format!(
                                "{}[+] <unresolved blob in {}/{}>{}",
                                GREEN,
                                target.account,
                                target.container,
                                RESET
                            )),
                            file: None,
                        }
                    } else {
                        ReportMessage::new(format!("{}[+] {}{}", GREEN, blob_url, RESET), blob_url)
                    };
                    self.report(msg).await;
                }
            }

            if listing.next_marker.is_empty() {
                break;
            }
            marker = Some(listing.next_marker);
            page += 1;
        }

        (decoded_pages, objects)
    }

    async fn report(&self, msg: ReportMessage) {
        if self.reports.send(msg).await.is_err() {
            tracing::debug!("report queue closed; dropping finding");
        }
    }
}
