use std::time::Duration;

/// How RETRY failure actions wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Wait used when neither the action nor the response names one.
    pub default_retry_after: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Let a `Retry-After` (or vendor) response header replace the declared `retryAfter`.
    pub honor_retry_after: bool,
    pub headers: RetryHeadersConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_retry_after: Duration::ZERO,
            max_delay: Duration::from_secs(300),
            honor_retry_after: true,
            headers: RetryHeadersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryHeadersConfig {
    /// Checked in order after the standard `Retry-After` header.
    pub vendor_headers: Vec<RetryVendorHeader>,
}

#[derive(Debug, Clone)]
pub struct RetryVendorHeader {
    pub name: String,
    pub kind: VendorHeaderKind,
}

impl RetryVendorHeader {
    pub fn new(name: impl Into<String>, kind: VendorHeaderKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorHeaderKind {
    DeltaSeconds,
    UnixSeconds,
    HttpDate,
}
