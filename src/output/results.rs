use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;

use crate::utils::format_size;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Per-account accumulator. Only mutated through [`ResultsMap::merge`].
#[derive(Debug, Clone, Default)]
pub struct ContainerStats {
    container_names: AHashSet<String>,
    num_files: u64,
    content_length: u64,
}

impl ContainerStats {
    pub fn num_containers(&self) -> usize {
        self.container_names.len()
    }

    pub fn num_files(&self) -> u64 {
        self.num_files
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    #[cfg(test)]
    fn has_container(&self, name: &str) -> bool {
        self.container_names.contains(name)
    }
}

/// Results for one scan run, shared by every probe task.
///
/// The lock is held for one merge or one snapshot copy and never across I/O.
#[derive(Debug, Default)]
pub struct ResultsMap {
    results: Mutex<AHashMap<String, ContainerStats>>,
}

impl ResultsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record findings for `container` under `account`. Re-adding a container name is a
    /// no-op for the name set but its counts still accumulate. Counts saturate at `u64::MAX`.
    pub fn merge(&self, account: &str, container: &str, num_files: u64, content_length: u64) {
        let mut results = self.results.lock();
        let entry = results.entry(account.to_string()).or_default();
        if !entry.container_names.contains(container) {
            entry.container_names.insert(container.to_string());
        }
        entry.num_files = entry.num_files.saturating_add(num_files);
        entry.content_length = entry.content_length.saturating_add(content_length);
    }

    pub fn get(&self, account: &str) -> Option<ContainerStats> {
        self.results.lock().get(account).cloned()
    }

    /// Consistent copy of all accounts, most files first.
    pub fn snapshot(&self) -> Summary {
        let mut accounts: Vec<AccountSummary> = {
            let results = self.results.lock();
            results
                .iter()
                .map(|(name, stats)| AccountSummary {
                    account: name.clone(),
                    num_files: stats.num_files,
                    num_containers: stats.num_containers(),
                    content_length: stats.content_length,
                })
                .collect()
        };
        accounts.sort_by(|a, b| b.num_files.cmp(&a.num_files).then_with(|| a.account.cmp(&b.account)));
        Summary::from_accounts(accounts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account: String,
    pub num_files: u64,
    pub num_containers: usize,
    pub content_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub accounts: Vec<AccountSummary>,
    pub total_files: u64,
    pub total_containers: usize,
    pub total_content_length: u64,
}

impl Summary {
    fn from_accounts(accounts: Vec<AccountSummary>) -> Self {
        let total_files = accounts.iter().fold(0u64, |acc, a| acc.saturating_add(a.num_files));
        let total_containers = accounts.iter().map(|a| a.num_containers).sum();
        let total_content_length = accounts.iter().fold(0u64, |acc, a| acc.saturating_add(a.content_length));
        Self { accounts, total_files, total_containers, total_content_length }
    }

    /// Console form of the summary, one line per account plus a grand total.
    pub fn render(&self) -> String {
        let mut out = String::from("[+] Results:\n");
        if self.accounts.is_empty() {
            out.push_str(&format!("{}[-] No files found.{}\n", RED, RESET));
            return out;
        }
        for a in &self.accounts {
            out.push_str(&format!(
                "{}[+] {} - {} files in {} containers ({}){}\n",
                GREEN,
                a.account,
                a.num_files,
                a.num_containers,
                format_size(a.content_length),
                RESET
            ));
        }
        out.push_str(&format!(
            "{}[+] Found a total of {} files across {} account(s) and {} containers ({}){}\n",
            GREEN,
            self.total_files,
            self.accounts.len(),
            self.total_containers,
            format_size(self.total_content_length),
            RESET
        ));
        out
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
