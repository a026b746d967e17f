use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

const STORAGE_DOMAIN_SUFFIX: &str = ".blob.core.windows.net";

static ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]{3,24}$").unwrap());
static CONTAINER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{2,62}$").unwrap());

/// Read a newline-delimited list, skipping blank lines.
pub fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let data = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(data.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
}

/// Lower-case, strip the storage domain and validate a storage account name.
pub fn normalize_account(raw: &str) -> Option<String> {
    let account = raw.trim().to_lowercase().replace(STORAGE_DOMAIN_SUFFIX, "");
    ACCOUNT_RE.is_match(&account).then_some(account)
}

pub fn normalize_container(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    CONTAINER_RE.is_match(&name).then_some(name)
}

pub fn filter_valid_accounts(raw: &[String]) -> (Vec<String>, usize) {
    filter_valid(raw, normalize_account, "storage account")
}

pub fn filter_valid_containers(raw: &[String]) -> (Vec<String>, usize) {
    filter_valid(raw, normalize_container, "container")
}

fn filter_valid(raw: &[String], normalize: fn(&str) -> Option<String>, kind: &str) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(raw.len());
    let mut removed = 0;
    for (idx, entry) in raw.iter().enumerate() {
        match normalize(entry) {
            Some(name) => {
                if seen.insert(name.clone()) {
                    kept.push(name);
                }
            }
            None => {
                tracing::info!("[~][{}] Skipping invalid {} name '{}'", idx, kind, entry);
                removed += 1;
            }
        }
    }
    (kept, removed)
}

/// Human-readable, 1024-based size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut idx = 0;
    while size >= 1024.0 && idx < UNITS.len() - 1 {
        size /= 1024.0;
        idx += 1;
    }
    format!("{:.1} {}", size, UNITS[idx])
}
