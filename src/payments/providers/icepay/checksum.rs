//! ICEPAY checksum scheme
//!
//! Outbound API calls are signed with SHA-256 over the request line, the
//! merchant credentials and the exact body. Inbound messages carry a SHA-1
//! over a fixed, ordered list of fields joined with `|`, secret first.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::payments::types::PostbackChannel;

/// Fields covered by the checksum on the buyer's return URL
pub const RETURN_FIELDS: &[&str] = &[
    "Merchant",
    "Status",
    "StatusCode",
    "OrderID",
    "PaymentID",
    "Reference",
    "TransactionID",
];

/// Fields covered by the checksum on a server-to-server postback
pub const POSTBACK_FIELDS: &[&str] = &[
    "Merchant",
    "Status",
    "StatusCode",
    "OrderID",
    "PaymentID",
    "Reference",
    "TransactionID",
    "Amount",
    "Currency",
    "Duration",
    "ConsumerIPAddress",
];

pub fn fields_for(channel: PostbackChannel) -> &'static [&'static str] {
    match channel {
        PostbackChannel::BrowserReturn => RETURN_FIELDS,
        PostbackChannel::Webhook => POSTBACK_FIELDS,
    }
}

/// Checksum header value for an API request.
pub fn request_checksum(
    url: &str,
    method: &str,
    merchant_id: &str,
    secret: &str,
    body: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(merchant_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checksum of an inbound message given its field values in order.
pub fn message_checksum(secret: &str, values: &[&str]) -> String {
    let mut signed = String::from(secret);
    for value in values {
        signed.push('|');
        signed.push_str(value);
    }
    hex::encode(Sha1::digest(signed.as_bytes()))
}

/// Compare two hex digests without short-circuiting on the first mismatch.
///
/// Case-insensitive, the gateway is not consistent about hex casing.
pub fn digests_match(expected: &str, provided: &str) -> bool {
    let provided = provided.trim();
    if expected.len() != provided.len() {
        return false;
    }

    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0, |acc, (a, b)| {
            acc | (a.to_ascii_lowercase() ^ b.to_ascii_lowercase())
        })
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_checksum_is_sha1_of_joined_values() {
        // sha1("secret|a|b")
        let expected = hex::encode(Sha1::digest(b"secret|a|b"));
        assert_eq!(message_checksum("secret", &["a", "b"]), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn test_message_checksum_keeps_empty_values() {
        assert_ne!(
            message_checksum("secret", &["a", "", "b"]),
            message_checksum("secret", &["a", "b"])
        );
    }

    #[test]
    fn test_request_checksum_covers_every_part() {
        let base = request_checksum("https://x/payment/checkout", "POST", "1", "s", "{}");
        assert_eq!(base.len(), 64);
        assert_eq!(
            base,
            request_checksum("https://x/payment/checkout", "post", "1", "s", "{}")
        );
        assert_ne!(base, request_checksum("https://x/payment/checkout", "POST", "2", "s", "{}"));
        assert_ne!(base, request_checksum("https://x/payment/checkout", "POST", "1", "t", "{}"));
        assert_ne!(base, request_checksum("https://x/payment/checkout", "POST", "1", "s", "{ }"));
    }

    #[test]
    fn test_digests_match() {
        let digest = message_checksum("secret", &["OK"]);
        assert!(digests_match(&digest, &digest));
        assert!(digests_match(&digest, &digest.to_uppercase()));
        assert!(!digests_match(&digest, &message_checksum("secret", &["ERR"])));
        assert!(!digests_match(&digest, ""));
        assert!(!digests_match(&digest, "invalid_signature"));
    }

    #[test]
    fn test_channel_field_sets() {
        assert_eq!(fields_for(PostbackChannel::BrowserReturn).len(), 7);
        assert_eq!(fields_for(PostbackChannel::Webhook).len(), 11);
        assert!(POSTBACK_FIELDS.starts_with(RETURN_FIELDS));
    }
}
