//! Decoder for one page of the container listing API (`comp=list`).
//!
//! The service answers with an `EnumerationResults` document:
//!
//! ```xml
//! <EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="logs">
//!   <Blobs>
//!     <Blob>
//!       <Name>2023/app.log</Name>
//!       <Properties><Content-Length>1024</Content-Length></Properties>
//!     </Blob>
//!   </Blobs>
//!   <NextMarker>2!92!MDAwMDI0</NextMarker>
//! </EnumerationResults>
//! ```
//!
//! Older API versions put a direct `<Url>` on every blob and an absolute URL in
//! `ContainerName`; both shapes are accepted.

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "@ContainerName", default)]
    container_name: String,
    #[serde(rename = "@ServiceEndpoint", default)]
    service_endpoint: Option<String>,
    #[serde(rename = "Blobs", default)]
    blobs: RawBlobs,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlobs {
    #[serde(rename = "Blob", default)]
    blob: Vec<RawBlob>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlob {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Url", default)]
    url: Option<String>,
    #[serde(rename = "Properties", default)]
    properties: Option<RawProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(rename = "Content-Length", default)]
    content_length: Option<String>,
}

/// One blob from a listing page with its URL already resolved.
///
/// `url` is empty when neither the entry nor the page carried enough to build one;
/// the blob still counts as found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub name: Option<String>,
    pub url: String,
    pub content_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub container: String,
    pub blobs: Vec<BlobEntry>,
    /// Empty when this is the last page.
    pub next_marker: String,
}

impl ListingPage {
    pub fn object_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn total_content_length(&self) -> u64 {
        self.blobs.iter().fold(0u64, |acc, b| acc.saturating_add(b.content_length))
    }

    pub fn blob_urls(&self) -> impl Iterator<Item = &str> {
        self.blobs.iter().map(|b| b.url.as_str())
    }
}

/// Decode a raw listing response body.
pub fn decode_page(body: &[u8]) -> anyhow::Result<ListingPage> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let text = std::str::from_utf8(body).context("listing page is not valid UTF-8")?;
    let raw: EnumerationResults = quick_xml::de::from_str(text).context("malformed listing page")?;

    let container_is_url = is_https_location(&raw.container_name);
    let endpoint = raw.service_endpoint.as_deref().filter(|e| is_https_location(e));

    let blobs = raw
        .blobs
        .blob
        .into_iter()
        .map(|b| {
            let url = resolve_blob_url(&b, &raw.container_name, container_is_url, endpoint);
            let content_length = b
                .properties
                .as_ref()
                .and_then(|p| p.content_length.as_deref())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);
            BlobEntry { name: b.name, url, content_length }
        })
        .collect();

    Ok(ListingPage {
        container: raw.container_name,
        blobs,
        next_marker: raw.next_marker.map(|m| m.trim().to_string()).unwrap_or_default(),
    })
}

// Precedence: direct Url, then ContainerName as a location, then ServiceEndpoint.
fn resolve_blob_url(blob: &RawBlob, container: &str, container_is_url: bool, endpoint: Option<&str>) -> String {
    if let Some(url) = blob.url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    let name = match blob.name.as_deref().filter(|n| !n.is_empty()) {
        Some(n) => n,
        None => return String::new(),
    };
    if container_is_url {
        return format!("{}/{}", container.trim_end_matches('/'), name);
    }
    if let Some(endpoint) = endpoint {
        return format!("{}/{}/{}", endpoint.trim_end_matches('/'), container, name);
    }
    String::new()
}

fn is_https_location(s: &str) -> bool {
    url::Url::parse(s).map(|u| u.scheme() == "https" && u.has_host()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_url_wins() {
        let xml = r#"<EnumerationResults ContainerName="https://a/c">
            <Blobs><Blob><Name>x</Name><Url>https://a/c/x</Url></Blob></Blobs>
        </EnumerationResults>"#;
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.blob_urls().collect::<Vec<_>>(), vec!["https://a/c/x"]);
    }

    #[test]
    fn container_location_used_for_named_blob() {
        let xml = r#"<EnumerationResults ContainerName="https://a/c">
            <Blobs><Blob><Name>y</Name></Blob></Blobs>
        </EnumerationResults>"#;
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.blobs[0].url, "https://a/c/y");
    }

    #[test]
    fn service_endpoint_used_when_container_is_plain_name() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
        <EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="logs">
            <Blobs><Blob><Name>2023/app.log</Name>
                <Properties><Content-Length>10</Content-Length><BlobType>BlockBlob</BlobType></Properties>
            </Blob></Blobs>
            <NextMarker />
        </EnumerationResults>"#;
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.blobs[0].url, "https://acct.blob.core.windows.net/logs/2023/app.log");
        assert_eq!(page.next_marker, "");
    }

    #[test]
    fn unresolvable_blob_keeps_placeholder_and_counts() {
        let xml = r#"<EnumerationResults ContainerName="c">
            <Blobs>
                <Blob><Name>z</Name><Properties><Content-Length>7</Content-Length></Properties></Blob>
                <Blob><Properties><Content-Length>3</Content-Length></Properties></Blob>
            </Blobs>
        </EnumerationResults>"#;
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.object_count(), 2);
        assert!(page.blob_urls().all(str::is_empty));
        assert_eq!(page.total_content_length(), 10);
    }

    #[test]
    fn sums_lengths_and_reads_marker() {
        let xml = "\u{feff}<EnumerationResults ContainerName=\"https://a/c\"><Blobs>\
            <Blob><Name>a</Name><Properties><Content-Length>100</Content-Length></Properties></Blob>\
            <Blob><Name>b</Name><Properties><Content-Length>23</Content-Length></Properties></Blob>\
            <Blob><Name>c</Name></Blob>\
            </Blobs><NextMarker>page2</NextMarker></EnumerationResults>";
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.object_count(), 3);
        assert_eq!(page.total_content_length(), 123);
        assert_eq!(page.next_marker, "page2");
    }

    #[test]
    fn oversized_lengths_clamp_instead_of_wrapping() {
        let xml = "<EnumerationResults ContainerName=\"https://a/c\"><Blobs>\
            <Blob><Name>a</Name><Properties><Content-Length>18446744073709551615</Content-Length></Properties></Blob>\
            <Blob><Name>b</Name><Properties><Content-Length>1</Content-Length></Properties></Blob>\
            </Blobs></EnumerationResults>";
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.object_count(), 2);
        assert_eq!(page.total_content_length(), u64::MAX);
    }

    #[test]
    fn empty_listing() {
        let xml = r#"<EnumerationResults ContainerName="c"><Blobs /></EnumerationResults>"#;
        let page = decode_page(xml.as_bytes()).unwrap();
        assert_eq!(page.object_count(), 0);
        assert_eq!(page.next_marker, "");
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let xml = "<EnumerationResults><Blobs><Blob></Blobs></EnumerationResults>";
        assert!(decode_page(xml.as_bytes()).is_err());
        assert!(decode_page(&[0xff, 0xfe, 0x00]).is_err());
    }
}
