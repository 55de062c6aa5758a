//! Document key → vector-store namespace.
//!
//! Namespaces must be printable ASCII and are limited in length by the
//! vector store. [`sanitize_key`] percent-escapes every byte outside the
//! printable ASCII range (and `%` itself), so the escaped form is injective:
//! two keys that differ only in non-ASCII characters still yield different
//! namespaces.
//!
//! Keys whose escaped form exceeds [`MAX_NAMESPACE_BYTES`] are truncated at an
//! escape boundary and suffixed with `-` plus 16 hex characters of the SHA-256
//! of the original key. Two long keys sharing the same truncated prefix can
//! therefore only collide on a 64-bit hash collision.
//!
//! # Example
//!
//! ```rust
//! use pdfchat_core::namespace::sanitize_key;
//!
//! assert_eq!(sanitize_key("uploads/report.pdf"), "uploads/report.pdf");
//! assert_eq!(sanitize_key("uploads/my file.pdf"), "uploads/my%20file.pdf");
//! assert_eq!(sanitize_key("é"), "%C3%A9");
//! ```

use sha2::{Digest, Sha256};

/// Upper bound on namespace length, in bytes.
pub const MAX_NAMESPACE_BYTES: usize = 512;

/// Hex characters of the key digest appended to truncated namespaces.
const DIGEST_SUFFIX_CHARS: usize = 16;

/// Map an arbitrary document key to a namespace identifier.
///
/// Never fails. The output contains only bytes in `0x21..=0x7E` and is at
/// most [`MAX_NAMESPACE_BYTES`] long.
pub fn sanitize_key(key: &str) -> String {
    let escaped = escape(key);
    if escaped.len() <= MAX_NAMESPACE_BYTES {
        return escaped;
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    let budget = MAX_NAMESPACE_BYTES - DIGEST_SUFFIX_CHARS - 1;
    let cut = escape_boundary(&escaped, budget);

    let mut out = String::with_capacity(MAX_NAMESPACE_BYTES);
    out.push_str(&escaped[..cut]);
    out.push('-');
    out.push_str(&digest[..DIGEST_SUFFIX_CHARS]);
    out
}

fn escape(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'%' => out.push_str("%25"),
            0x21..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Largest cut position `<= limit` that does not split a `%XX` escape.
///
/// `escaped` is pure ASCII, so every index is a char boundary.
fn escape_boundary(escaped: &str, limit: usize) -> usize {
    let bytes = escaped.as_bytes();
    let mut cut = limit.min(bytes.len());
    for back in 1..=2 {
        if cut >= back && bytes[cut - back] == b'%' {
            cut -= back;
            break;
        }
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_printable_ascii(s: &str) -> bool {
        s.bytes().all(|b| (0x21..=0x7E).contains(&b))
    }

    #[test]
    fn test_plain_key_unchanged() {
        assert_eq!(
            sanitize_key("uploads/1700000000report.pdf"),
            "uploads/1700000000report.pdf"
        );
    }

    #[test]
    fn test_deterministic() {
        let key = "uploads/Résumé 2024 – final.pdf";
        assert_eq!(sanitize_key(key), sanitize_key(key));
    }

    #[test]
    fn test_non_ascii_differences_stay_distinct() {
        let pairs = [
            ("résumé.pdf", "resume.pdf"),
            ("a€.pdf", "a£.pdf"),
            ("日本.pdf", "中国.pdf"),
            ("x\u{0301}.pdf", "x.pdf"),
        ];
        for (a, b) in pairs {
            assert_ne!(sanitize_key(a), sanitize_key(b), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_percent_is_escaped_so_escapes_cannot_be_forged() {
        // A literal "%C3%A9" must not collide with "é".
        assert_ne!(sanitize_key("%C3%A9"), sanitize_key("é"));
        assert_eq!(sanitize_key("100%"), "100%25");
    }

    #[test]
    fn test_whitespace_and_control_chars_escaped() {
        assert_eq!(sanitize_key("a b\tc\n"), "a%20b%09c%0A");
    }

    #[test]
    fn test_output_is_printable_ascii() {
        for key in ["", "plain", "spaces here", "ünïcödé", "emoji 🎉", "\u{0}\u{7f}"] {
            assert!(is_printable_ascii(&sanitize_key(key)), "{:?}", key);
        }
    }

    #[test]
    fn test_long_key_bounded() {
        let key = "é".repeat(400);
        let ns = sanitize_key(&key);
        assert!(ns.len() <= MAX_NAMESPACE_BYTES);
        assert!(is_printable_ascii(&ns));
    }

    #[test]
    fn test_long_keys_with_shared_prefix_differ() {
        let prefix = "a".repeat(600);
        let a = format!("{}-one.pdf", prefix);
        let b = format!("{}-two.pdf", prefix);
        assert_ne!(sanitize_key(&a), sanitize_key(&b));
    }

    #[test]
    fn test_truncation_never_splits_escape() {
        // Shift the escape position across the cut point.
        for pad in 0..4 {
            let key = format!("{}{}", "a".repeat(490 + pad), "é".repeat(20));
            let ns = sanitize_key(&key);
            let (body, _) = ns.rsplit_once('-').unwrap();
            if let Some(pos) = body.rfind('%') {
                assert!(body.len() - pos >= 3, "split escape at end of {:?}", body);
            }
            assert!(ns.len() <= MAX_NAMESPACE_BYTES);
        }
    }

    #[test]
    fn test_exactly_at_limit_not_suffixed() {
        let key = "k".repeat(MAX_NAMESPACE_BYTES);
        assert_eq!(sanitize_key(&key), key);
    }
}
