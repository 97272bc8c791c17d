use std::time::{Duration, SystemTime};

use arazzo_runtime::retry::{
    decide_retry, parse_retry_after, RetryConfig, RetryHeadersConfig, RetryReason,
    RetryVendorHeader, VendorHeaderKind,
};
use arazzo_runtime::HttpMessage;

fn response(name: &str, value: &str) -> HttpMessage {
    let mut message = HttpMessage::default();
    message.headers.insert(name.to_string(), value.to_string());
    message
}

#[test]
fn retry_after_delta_seconds() {
    let resp = response("Retry-After", "5");
    let result = parse_retry_after(&resp, &RetryHeadersConfig::default(), SystemTime::now());
    assert_eq!(result, Some(Duration::from_secs(5)));
}

#[test]
fn retry_after_http_date() {
    let now = SystemTime::now();
    let resp = response("Retry-After", &httpdate::fmt_http_date(now + Duration::from_secs(10)));
    let delay = parse_retry_after(&resp, &RetryHeadersConfig::default(), now).unwrap();
    assert!(delay.as_secs() >= 9 && delay.as_secs() <= 10, "{delay:?}");
}

#[test]
fn retry_after_in_the_past_means_no_wait() {
    let now = SystemTime::now();
    let resp = response("Retry-After", &httpdate::fmt_http_date(now - Duration::from_secs(60)));
    assert_eq!(
        parse_retry_after(&resp, &RetryHeadersConfig::default(), now),
        Some(Duration::ZERO)
    );
}

#[test]
fn retry_after_header_name_is_case_insensitive() {
    let resp = response("retry-after", "3");
    assert_eq!(
        parse_retry_after(&resp, &RetryHeadersConfig::default(), SystemTime::now()),
        Some(Duration::from_secs(3))
    );
}

#[test]
fn vendor_headers_are_consulted_in_order() {
    let now = SystemTime::now();
    let reset_at = (now + Duration::from_secs(15))
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let mut resp = response("X-RateLimit-Reset", &reset_at.to_string());
    resp.headers.insert("X-Wait".to_string(), "2".to_string());

    let cfg = RetryHeadersConfig {
        vendor_headers: vec![
            RetryVendorHeader::new("x-missing", VendorHeaderKind::DeltaSeconds),
            RetryVendorHeader::new("x-ratelimit-reset", VendorHeaderKind::UnixSeconds),
            RetryVendorHeader::new("x-wait", VendorHeaderKind::DeltaSeconds),
        ],
    };
    let delay = parse_retry_after(&resp, &cfg, now).unwrap();
    assert!(delay.as_secs() >= 14 && delay.as_secs() <= 15, "{delay:?}");
}

#[test]
fn standard_header_wins_over_vendor_header() {
    let mut resp = response("Retry-After", "1");
    resp.headers.insert("X-Wait".to_string(), "9".to_string());
    let cfg = RetryHeadersConfig {
        vendor_headers: vec![RetryVendorHeader::new("X-Wait", VendorHeaderKind::DeltaSeconds)],
    };
    assert_eq!(
        parse_retry_after(&resp, &cfg, SystemTime::now()),
        Some(Duration::from_secs(1))
    );
}

#[test]
fn garbage_values_are_ignored() {
    let resp = response("Retry-After", "soon");
    assert_eq!(
        parse_retry_after(&resp, &RetryHeadersConfig::default(), SystemTime::now()),
        None
    );
}

#[test]
fn out_of_range_unix_timestamp_is_ignored() {
    let mut resp = response("X-Reset", &u64::MAX.to_string());
    resp.headers.insert("X-Wait".to_string(), "3".to_string());
    let cfg = RetryHeadersConfig {
        vendor_headers: vec![
            RetryVendorHeader::new("X-Reset", VendorHeaderKind::UnixSeconds),
            RetryVendorHeader::new("X-Wait", VendorHeaderKind::DeltaSeconds),
        ],
    };
    assert_eq!(
        parse_retry_after(&resp, &cfg, SystemTime::now()),
        Some(Duration::from_secs(3))
    );

    let alone = response("X-Reset", &u64::MAX.to_string());
    let cfg = RetryHeadersConfig {
        vendor_headers: vec![RetryVendorHeader::new("X-Reset", VendorHeaderKind::UnixSeconds)],
    };
    assert_eq!(parse_retry_after(&alone, &cfg, SystemTime::now()), None);
}

#[test]
fn hint_feeds_the_retry_decision() {
    let resp = response("Retry-After", "4");
    let hint = parse_retry_after(&resp, &RetryHeadersConfig::default(), SystemTime::now());
    let decision = decide_retry(&RetryConfig::default(), hint, Some(Duration::from_secs(1)));
    assert_eq!(decision.delay, Duration::from_secs(4));
    assert_eq!(decision.reason, RetryReason::RetryAfterHeader);
}
