use std::time::{Duration, SystemTime};

use httpdate::parse_http_date;

use crate::retry::config::{RetryHeadersConfig, VendorHeaderKind};
use crate::snapshot::HttpMessage;

/// Delay hint carried by a response. The standard `Retry-After` header
/// (delta seconds or HTTP-date) wins over configured vendor headers. A
/// moment already in the past means no wait.
pub fn parse_retry_after(
    response: &HttpMessage,
    cfg: &RetryHeadersConfig,
    now: SystemTime,
) -> Option<Duration> {
    let standard = response.header("retry-after").and_then(|v| {
        parse_value(v, VendorHeaderKind::DeltaSeconds, now)
            .or_else(|| parse_value(v, VendorHeaderKind::HttpDate, now))
    });

    standard.or_else(|| {
        cfg.vendor_headers.iter().find_map(|vh| {
            response
                .header(&vh.name)
                .and_then(|v| parse_value(v, vh.kind, now))
        })
    })
}

fn parse_value(raw: &str, kind: VendorHeaderKind, now: SystemTime) -> Option<Duration> {
    let v = raw.trim();
    match kind {
        VendorHeaderKind::DeltaSeconds => v.parse::<u64>().ok().map(Duration::from_secs),
        VendorHeaderKind::UnixSeconds => {
            let ts = v.parse::<u64>().ok()?;
            let at = SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(ts))?;
            Some(until(now, at))
        }
        VendorHeaderKind::HttpDate => Some(until(now, parse_http_date(v).ok()?)),
    }
}

fn until(now: SystemTime, at: SystemTime) -> Duration {
    at.duration_since(now).unwrap_or(Duration::ZERO)
}
