/// Maximum number of listing pages walked per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    Unlimited,
    Max(u32),
}

impl PageLimit {
    /// Negative values mean "no cap", matching the `--max-pages -1` convention.
    pub fn from_signed(value: i64) -> Self {
        if value < 0 {
            PageLimit::Unlimited
        } else {
            PageLimit::Max(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }

    pub fn allows(&self, page: u32) -> bool {
        match self {
            PageLimit::Unlimited => true,
            PageLimit::Max(max) => page <= *max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_tasks: usize,
    pub blobs_only: bool,
    pub max_pages: PageLimit,
    pub invert: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_tasks: 5000, blobs_only: false, max_pages: PageLimit::Max(20), invert: false }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout_secs: u64,
    pub max_idle_per_host: usize,
    pub skip_tls_verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { timeout_secs: 90, max_idle_per_host: 10, skip_tls_verify: false }
    }
}
