//! Request signing
//!
//! Every request carries `Authorization: APIKEY <signature>`, where the
//! signature is a base64 HMAC-SHA1 over a canonical text built from the
//! method, the normalized `path?query`, the `date` header and the
//! protocol's custom headers, and the raw body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::fmt;

use crate::protocol::ProtocolVersion;

type HmacSha1 = Hmac<Sha1>;

/// Access credentials issued by Bluepipe
///
/// The access id is sent with every request; the access key never leaves
/// the process and is only used as the HMAC key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_id: String,
    pub access_key: String,
}

impl Credentials {
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Computes request signatures with a secret access key
#[derive(Clone)]
pub struct Signer {
    /// HMAC state already keyed with the access key
    mac: HmacSha1,
    header_prefix: String,
}

impl Signer {
    /// Signer covering the custom headers of the given protocol version
    pub fn new(access_key: impl Into<String>, protocol: ProtocolVersion) -> Self {
        Self::with_header_prefix(access_key, protocol.signed_header_prefix())
    }

    /// Signer covering `date` plus every header starting with `prefix`
    pub fn with_header_prefix(access_key: impl Into<String>, prefix: &str) -> Self {
        Self {
            mac: keyed_mac(access_key.into().as_bytes()),
            header_prefix: prefix.to_ascii_lowercase(),
        }
    }

    /// Build the canonical text that gets signed
    ///
    /// Layout: `METHOD path?query`, then the selected `name:value` header
    /// lines sorted by bytes, one per line; with a body, an empty line and
    /// the raw body follow.
    pub fn signing_string<I, K, V>(
        &self,
        method: &str,
        path_and_query: &str,
        headers: I,
        body: Option<&[u8]>,
    ) -> Vec<u8>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut lines: Vec<String> = headers
            .into_iter()
            .filter_map(|(name, value)| {
                let name = name.as_ref().trim().to_ascii_lowercase();
                self.is_signed(&name)
                    .then(|| format!("{}:{}", name, value.as_ref().trim()))
            })
            .collect();
        lines.sort();

        let mut text = format!("{} {}", method.to_ascii_uppercase(), path_and_query).into_bytes();
        for line in &lines {
            text.push(b'\n');
            text.extend_from_slice(line.as_bytes());
        }
        if let Some(body) = body {
            text.extend_from_slice(b"\n\n");
            text.extend_from_slice(body);
        }
        text
    }

    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path_and_query` - Normalized path including the endpoint prefix and canonical query
    /// * `headers` - All request headers; only the selected ones are covered
    /// * `body` - Raw request body, if any
    ///
    /// # Returns
    /// Base64-encoded HMAC-SHA1 digest
    pub fn sign<I, K, V>(
        &self,
        method: &str,
        path_and_query: &str,
        headers: I,
        body: Option<&[u8]>,
    ) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let text = self.signing_string(method, path_and_query, headers, body);
        self.digest(&text)
    }

    fn digest(&self, text: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(text);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    fn is_signed(&self, lowercase_name: &str) -> bool {
        lowercase_name == "date" || lowercase_name.starts_with(&self.header_prefix)
    }
}

/// Key an HMAC-SHA1 with a key of any length
///
/// Keys longer than one SHA-1 block are hashed first; the key block is then
/// zero padded to the block size.
fn keyed_mac(access_key: &[u8]) -> HmacSha1 {
    let mut block = Key::<HmacSha1>::default();
    if access_key.len() > block.len() {
        let hashed = Sha1::digest(access_key);
        block[..hashed.len()].copy_from_slice(&hashed);
    } else {
        block[..access_key.len()].copy_from_slice(access_key);
    }
    <HmacSha1 as KeyInit>::new(&block)
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("header_prefix", &self.header_prefix)
            .finish_non_exhaustive()
    }
}

/// Percent-encode and sort query parameters, then join them with `&`
///
/// Pairs are ordered by encoded key, then encoded value, so the result does
/// not depend on the order the caller supplied them in.
pub fn canonical_query<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k.as_ref()).into_owned(),
                urlencoding::encode(v.as_ref()).into_owned(),
            )
        })
        .collect();
    pairs.sort();

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "Thu, 01 Jan 2026 00:00:00 GMT";

    fn headers(nonce: &str, agent: &str) -> Vec<(&'static str, String)> {
        vec![
            ("Accept", "application/json".to_string()),
            ("Date", DATE.to_string()),
            ("User-Agent", agent.to_string()),
            ("X-Api-Nonce", nonce.to_string()),
            ("X-Api-Key", "etl".to_string()),
        ]
    }

    #[test]
    fn test_signing_string_layout() {
        let signer = Signer::new("secret", ProtocolVersion::V2);
        let text = signer.signing_string(
            "post",
            "/api/v1/job/42/start",
            headers("n1", "cli"),
            Some(br#"{"a":1}"#),
        );

        assert_eq!(
            String::from_utf8(text).unwrap(),
            "POST /api/v1/job/42/start\n\
             date:Thu, 01 Jan 2026 00:00:00 GMT\n\
             x-api-key:etl\n\
             x-api-nonce:n1\n\
             \n\
             {\"a\":1}"
        );
    }

    #[test]
    fn test_known_signature() {
        let signer = Signer::new("secret", ProtocolVersion::V2);

        let with_body = signer.sign(
            "POST",
            "/api/v1/job/42/start",
            headers("00112233445566778899aabbccddeeff", "cli"),
            Some(br#"{"a":1}"#),
        );
        assert_eq!(with_body, "31UZ4zzTQ3TlZfuHXjwWkqmE7JE=");

        let without_body = signer.sign(
            "GET",
            "/api/v1/instance/abc",
            [("Date", DATE), ("X-Api-Key", "etl")],
            None,
        );
        assert_eq!(without_body, "VPFEzJXy60rnMvHlzrFvA2knbog=");
    }

    #[test]
    fn test_block_sized_and_long_keys() {
        let long = Signer::new("k".repeat(100), ProtocolVersion::V2);
        assert_eq!(
            long.sign("GET", "/x", Vec::<(&str, &str)>::new(), None),
            "P+Rlld4zmavmfDWTMsSXieZxVXc="
        );

        let exact = Signer::new("k".repeat(64), ProtocolVersion::V2);
        assert_eq!(
            exact.sign("GET", "/x", Vec::<(&str, &str)>::new(), None),
            "Ic7GOytHALSjFcWnWYkNUS3p2Yo="
        );
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = Signer::new("secret", ProtocolVersion::V2);
        let first = signer.sign("GET", "/x", headers("n1", "cli"), None);
        let second = signer.sign("GET", "/x", headers("n1", "cli"), None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_selected_header_changes_signature() {
        let signer = Signer::new("secret", ProtocolVersion::V2);
        let first = signer.sign("GET", "/x", headers("n1", "cli"), None);
        let second = signer.sign("GET", "/x", headers("n2", "cli"), None);
        assert_ne!(first, second);
    }

    #[test]
    fn test_unselected_header_does_not_change_signature() {
        let signer = Signer::new("secret", ProtocolVersion::V2);
        let first = signer.sign("GET", "/x", headers("n1", "cli/1.0"), None);
        let second = signer.sign("GET", "/x", headers("n1", "cli/2.0"), None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_order_does_not_matter() {
        let signer = Signer::new("secret", ProtocolVersion::V2);
        let mut reversed = headers("n1", "cli");
        reversed.reverse();

        assert_eq!(
            signer.sign("GET", "/x", headers("n1", "cli"), None),
            signer.sign("GET", "/x", reversed, None)
        );
    }

    #[test]
    fn test_legacy_prefix_selects_ca_headers() {
        let signer = Signer::new("secret", ProtocolVersion::V1);
        let text = signer.signing_string(
            "GET",
            "/x",
            [("X-CA-Key", "etl"), ("X-Api-Key", "ignored"), ("Date", DATE)],
            None,
        );

        assert_eq!(
            String::from_utf8(text).unwrap(),
            "GET /x\ndate:Thu, 01 Jan 2026 00:00:00 GMT\nx-ca-key:etl"
        );
    }

    #[test]
    fn test_canonical_query_is_order_independent() {
        assert_eq!(
            canonical_query([("a", "1"), ("b", "2")]),
            canonical_query([("b", "2"), ("a", "1")])
        );
        assert_eq!(canonical_query([("b", "2"), ("a", "1")]), "a=1&b=2");
    }

    #[test]
    fn test_canonical_query_encodes() {
        assert_eq!(
            canonical_query([("table", "db/orders x"), ("q", "a&b")]),
            "q=a%26b&table=db%2Forders%20x"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let credentials = Credentials::new("etl", "secret");
        assert!(!format!("{:?}", credentials).contains("secret"));
        let signer = Signer::new("secret", ProtocolVersion::V2);
        assert!(!format!("{:?}", signer).contains("secret"));
    }
}
