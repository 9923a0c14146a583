//! Failure classification.
//!
//! Pure decisions over a failed call: whether to retry it, how severe it is,
//! and whether it points at the backend being unreachable. No state, no side
//! effects.

use http::Method;

use crate::failure::{Payload, RawFailure, RuntimeKind, Severity};

/// Whether a failed call may be attempted again.
///
/// 408 and 429 are always retryable. Network failures (status 0) and server
/// errors are retryable, except that POST/PUT/PATCH need the retry-safe
/// opt-in header. Everything else is final.
pub fn is_retryable(status: u16, method: &Method, has_retry_safe_header: bool) -> bool {
    match status {
        408 | 429 => true,
        0 | 500..=u16::MAX => !is_non_idempotent_write(method) || has_retry_safe_header,
        _ => false,
    }
}

fn is_non_idempotent_write(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Severity of a failure.
pub fn classify_severity(failure: &RawFailure) -> Severity {
    match failure {
        RawFailure::Runtime(fault)
            if matches!(
                fault.kind,
                RuntimeKind::NullDereference | RuntimeKind::UndefinedReference
            ) =>
        {
            Severity::Critical
        }
        RawFailure::Wrapped { original, .. } => classify_severity(original),
        RawFailure::Http(h) => match h.status {
            0 | 500..=u16::MAX => Severity::High,
            400..=499 => Severity::Medium,
            _ => Severity::Low,
        },
        _ if is_network_error(failure) => Severity::High,
        _ => Severity::Medium,
    }
}

/// Whether a failure suggests the backend is unreachable or failing.
pub fn is_network_error(failure: &RawFailure) -> bool {
    match failure {
        RawFailure::Network(_) => true,
        RawFailure::Http(h) => h.status == 0 || h.status >= 500,
        RawFailure::Runtime(r) => r.name == "NetworkError" || r.message.contains("network"),
        RawFailure::Wrapped { original, .. } => is_network_error(original),
        RawFailure::Message(s) => s.contains("network"),
        RawFailure::Opaque(p) => payload_is_network_error(p),
    }
}

fn payload_is_network_error(p: &Payload) -> bool {
    let status = p.get("status").and_then(|s| s.as_number());
    if matches!(status, Some(s) if s == 0.0 || s >= 500.0) {
        return true;
    }
    if p.get("name").as_ref().and_then(Payload::as_text) == Some("NetworkError") {
        return true;
    }
    if p.text_field("message").is_some_and(|m| m.contains("network")) {
        return true;
    }
    let typed_error = p.get("type").as_ref().and_then(Payload::as_text) == Some("error");
    let has_status = p.get("status").is_some_and(|s| s.is_truthy());
    typed_error && !has_status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{HttpFailure, NetworkCause, NetworkFailure, RuntimeFault};

    fn http(status: u16) -> RawFailure {
        HttpFailure::new(status, "", Method::GET, "http://localhost:8787/api").into()
    }

    #[test]
    fn test_get_retryable_iff_transient() {
        for s in 0..=999u16 {
            let expected = s == 0 || s >= 500 || s == 408 || s == 429;
            assert_eq!(is_retryable(s, &Method::GET, false), expected, "status {}", s);
        }
    }

    #[test]
    fn test_client_errors_never_retried_for_writes() {
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            for s in (400..=499u16).filter(|s| *s != 408 && *s != 429) {
                assert!(!is_retryable(s, &method, false));
                assert!(!is_retryable(s, &method, true));
            }
        }
    }

    #[test]
    fn test_writes_need_retry_safe_header() {
        assert!(!is_retryable(503, &Method::POST, false));
        assert!(is_retryable(503, &Method::POST, true));
        assert!(!is_retryable(0, &Method::PATCH, false));
        assert!(is_retryable(429, &Method::PUT, false));
        assert!(is_retryable(500, &Method::DELETE, false));
        assert!(is_retryable(500, &Method::HEAD, false));
    }

    #[test]
    fn test_severity() {
        assert_eq!(classify_severity(&http(503)), Severity::High);
        assert_eq!(classify_severity(&http(401)), Severity::Medium);
        assert_eq!(classify_severity(&http(403)), Severity::Medium);
        assert_eq!(classify_severity(&http(422)), Severity::Medium);
        assert_eq!(classify_severity(&http(304)), Severity::Low);

        let npe: RawFailure = RuntimeFault::null_dereference("Cannot read property 'x' of null").into();
        assert_eq!(classify_severity(&npe), Severity::Critical);
        let undef: RawFailure = RuntimeFault::undefined_reference("y is not defined").into();
        assert_eq!(classify_severity(&undef), Severity::Critical);
        assert_eq!(classify_severity(&RawFailure::wrapped(undef, None)), Severity::Critical);

        let net: RawFailure = NetworkFailure::new(NetworkCause::Connect, "refused").into();
        assert_eq!(classify_severity(&net), Severity::High);
        assert_eq!(classify_severity(&RawFailure::Message("oops".into())), Severity::Medium);
    }

    #[test]
    fn test_http_status_zero_is_network_class() {
        let failure = http(0);
        assert_eq!(failure.status(), Some(0));
        assert!(is_retryable(0, &Method::GET, false));
        assert!(is_network_error(&failure));
        assert_eq!(classify_severity(&failure), Severity::High);
    }

    #[test]
    fn test_network_error_shapes() {
        let status = |s: u16| RawFailure::Opaque(Payload::object([("status", Payload::from(s))]));
        assert!(is_network_error(&status(0)));
        assert!(is_network_error(&status(503)));
        assert!(!is_network_error(&status(404)));

        let named = RawFailure::Opaque(Payload::object([("name", "NetworkError")]));
        assert!(is_network_error(&named));

        let typed = RawFailure::Opaque(Payload::object([("type", "error")]));
        assert!(is_network_error(&typed));

        let msg = RawFailure::Opaque(Payload::object([("message", "network unreachable")]));
        assert!(is_network_error(&msg));

        assert!(is_network_error(&http(500)));
        assert!(!is_network_error(&http(404)));
    }
}
