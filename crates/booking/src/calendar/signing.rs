use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const CALENDAR_AUTH_TIMESTAMP_HEADER: &str = "x-calendar-timestamp";
pub const CALENDAR_AUTH_NONCE_HEADER: &str = "x-calendar-nonce";
pub const CALENDAR_AUTH_SIGNATURE_HEADER: &str = "x-calendar-signature";

/// HMAC-SHA256 over the NUL-separated method, path, timestamp, nonce and
/// body, hex encoded.
pub fn sign_calendar_request(
    secret: &str,
    method: &str,
    path: &str,
    timestamp: i64,
    nonce: &str,
    body: &[u8],
) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts a key of any size");
    mac.update(method.as_bytes());
    mac.update(&[0u8]);
    mac.update(path.as_bytes());
    mac.update(&[0u8]);
    mac.update(timestamp.to_string().as_bytes());
    mac.update(&[0u8]);
    mac.update(nonce.as_bytes());
    mac.update(&[0u8]);
    mac.update(body);

    to_lower_hex(mac.finalize().into_bytes().as_slice())
}

pub fn verify_calendar_signature(
    secret: &str,
    method: &str,
    path: &str,
    timestamp: i64,
    nonce: &str,
    body: &[u8],
    signature: &str,
) -> bool {
    let expected = sign_calendar_request(secret, method, path, timestamp, nonce, body);
    constant_time_eq(&expected, signature.trim())
}

fn constant_time_eq(left: &str, right: &str) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut diff = 0_u8;
    for (lhs, rhs) in left.as_bytes().iter().zip(right.as_bytes().iter()) {
        diff |= lhs ^ rhs;
    }

    diff == 0
}

fn to_lower_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::{sign_calendar_request, verify_calendar_signature};

    #[test]
    fn signature_is_stable_hex_and_verifies() {
        let signature =
            sign_calendar_request("secret", "GET", "/slots", 1_741_600_000, "nonce-1", b"");
        assert_eq!(signature.len(), 64);
        assert!(signature.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(verify_calendar_signature(
            "secret",
            "GET",
            "/slots",
            1_741_600_000,
            "nonce-1",
            b"",
            &signature
        ));
    }

    #[test]
    fn signature_covers_body_and_path() {
        let base = sign_calendar_request("secret", "POST", "/reservations", 1, "n", b"{}");
        assert!(!verify_calendar_signature(
            "secret",
            "POST",
            "/reservations",
            1,
            "n",
            b"{\"a\":1}",
            &base
        ));
        assert!(!verify_calendar_signature(
            "secret", "POST", "/slots", 1, "n", b"{}", &base
        ));
        assert!(!verify_calendar_signature(
            "other",
            "POST",
            "/reservations",
            1,
            "n",
            b"{}",
            &base
        ));
    }
}
