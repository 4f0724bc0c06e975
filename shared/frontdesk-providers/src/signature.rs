//! Webhook signature verification.
//!
//! Both schemes authenticate the raw request as received on the wire.
//! The payment scheme in particular must be fed the exact body bytes;
//! re-serializing the JSON first changes the digest and the check fails.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Accept payment webhooks up to this old, to absorb clock skew and
/// delivery retries without leaving a wide replay window.
pub const PAYMENT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Telephony webhook scheme: HMAC-SHA1 over the full callback URL with
/// every form parameter, sorted by key, appended as `key` + `value`.
/// The result is base64 and arrives in a request header.
pub fn verify_telephony_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(String, String)],
) -> bool {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut data = url.to_string();
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }

    let Some(expected) = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .ok()
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha1::new_from_slice(auth_token.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Payment webhook scheme: the signature header carries a timestamp and
/// one or more HMAC-SHA256 digests as `t=<unix>,v1=<hex>[,v1=<hex>...]`.
/// The signed payload is `"{t}.{raw_body}"`. `now` is the verifier's
/// clock as a unix timestamp, taken as a parameter so the tolerance
/// check stays testable.
pub fn verify_payment_signature(
    webhook_secret: &str,
    signature_header: &str,
    raw_body: &str,
    now: i64,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if candidates.is_empty() {
        return false;
    }

    if (now - timestamp).abs() > PAYMENT_SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let signed_payload = format!("{}.{}", timestamp, raw_body);
    candidates.into_iter().any(|candidate| {
        let Some(expected) = hex::decode(candidate).ok() else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_telephony(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut data = url.to_string();
        for (key, value) in sorted {
            data.push_str(key);
            data.push_str(value);
        }
        let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    fn sign_payment(secret: &str, timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    fn call_params() -> Vec<(String, String)> {
        vec![
            ("CallSid".to_string(), "CA1234".to_string()),
            ("CallStatus".to_string(), "completed".to_string()),
            ("From".to_string(), "+4915112345678".to_string()),
        ]
    }

    #[test]
    fn telephony_valid_signature() {
        let url = "https://api.example.com/webhooks/telephony/call-status";
        let params = call_params();
        let sig = sign_telephony("token", url, &params);
        assert!(verify_telephony_signature("token", &sig, url, &params));
    }

    #[test]
    fn telephony_param_order_does_not_matter() {
        let url = "https://api.example.com/webhooks/telephony/call-status";
        let mut params = call_params();
        let sig = sign_telephony("token", url, &params);
        params.reverse();
        assert!(verify_telephony_signature("token", &sig, url, &params));
    }

    #[test]
    fn telephony_rejects_tampered_params() {
        let url = "https://api.example.com/webhooks/telephony/call-status";
        let params = call_params();
        let sig = sign_telephony("token", url, &params);

        let mut tampered = call_params();
        tampered[1].1 = "failed".to_string();
        assert!(!verify_telephony_signature("token", &sig, url, &tampered));
    }

    #[test]
    fn telephony_rejects_wrong_token_and_garbage() {
        let url = "https://api.example.com/webhooks/telephony/call-status";
        let params = call_params();
        let sig = sign_telephony("token", url, &params);
        assert!(!verify_telephony_signature("other", &sig, url, &params));
        assert!(!verify_telephony_signature("token", "not base64 !!", url, &params));
    }

    #[test]
    fn payment_valid_signature() {
        let body = r#"{"type":"invoice.payment_succeeded"}"#;
        let header = sign_payment("whsec_test", 1_700_000_000, body);
        assert!(verify_payment_signature("whsec_test", &header, body, 1_700_000_000));
    }

    #[test]
    fn payment_rejects_reserialized_body() {
        let body = r#"{"type": "invoice.payment_succeeded"}"#;
        let header = sign_payment("whsec_test", 1_700_000_000, body);
        let reserialized = r#"{"type":"invoice.payment_succeeded"}"#;
        assert!(!verify_payment_signature(
            "whsec_test",
            &header,
            reserialized,
            1_700_000_000
        ));
    }

    #[test]
    fn payment_rejects_stale_timestamp() {
        let body = "{}";
        let header = sign_payment("whsec_test", 1_700_000_000, body);
        assert!(!verify_payment_signature(
            "whsec_test",
            &header,
            body,
            1_700_000_000 + PAYMENT_SIGNATURE_TOLERANCE_SECS + 1
        ));
        // Just inside the window is still fine.
        assert!(verify_payment_signature(
            "whsec_test",
            &header,
            body,
            1_700_000_000 + PAYMENT_SIGNATURE_TOLERANCE_SECS
        ));
    }

    #[test]
    fn payment_rejects_malformed_headers() {
        let body = "{}";
        assert!(!verify_payment_signature("whsec_test", "", body, 0));
        assert!(!verify_payment_signature("whsec_test", "t=abc,v1=00", body, 0));
        assert!(!verify_payment_signature("whsec_test", "v1=00", body, 0));
        assert!(!verify_payment_signature(
            "whsec_test",
            "t=1700000000",
            body,
            1_700_000_000
        ));
    }

    #[test]
    fn payment_accepts_any_matching_v1_candidate() {
        let body = "{}";
        let good = sign_payment("whsec_test", 1_700_000_000, body);
        let v1 = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={}", "00".repeat(32), v1);
        assert!(verify_payment_signature("whsec_test", &header, body, 1_700_000_000));
    }
}
