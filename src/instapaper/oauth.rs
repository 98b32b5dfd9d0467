//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Every call to the bookmarking API carries a fresh nonce and timestamp and a
//! signature over the canonical base string:
//!
//! ```text
//! METHOD & enc(url) & enc(k1=v1&k2=v2...)
//! ```
//!
//! keyed with `enc(consumer_secret) & enc(token_secret)`. `enc` is RFC 3986
//! percent-encoding: only `A-Z a-z 0-9 - . _ ~` pass through, so `! ' ( ) *`
//! are escaped too.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::clock::Clock;
use crate::error::InstapaperError;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `k=v` pairs sorted by key and joined with `&`, keys and values encoded.
pub fn normalize_params(params: &BTreeMap<String, String>) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn base_string(method: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    format!(
        "{}&{}&{}",
        percent_encode(&method.to_uppercase()),
        percent_encode(url),
        percent_encode(&normalize_params(params))
    )
}

pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Base64 HMAC-SHA1 of the base string. Pure: same inputs, same output.
pub fn sign(
    method: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, InstapaperError> {
    let key = signing_key(consumer_secret, token_secret);
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| InstapaperError::SignatureRequest(format!("invalid signing key: {}", e)))?;
    mac.update(base_string(method, url, params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 16 random bytes, hex encoded.
pub fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Parameters and signature for exactly one HTTP call.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    params: BTreeMap<String, String>,
    signature: String,
}

impl SignedRequest {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The parameters that went into the signature.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Form body: signed parameters plus `oauth_signature`.
    pub fn into_form(self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = self.params.into_iter().collect();
        form.push(("oauth_signature".to_string(), self.signature));
        form
    }
}

pub struct Signer {
    consumer_key: String,
    consumer_secret: String,
    clock: Arc<dyn Clock>,
}

impl Signer {
    pub fn new(consumer_key: &str, consumer_secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            clock,
        }
    }

    /// Fresh `oauth_*` parameters. Timestamp is taken now, never reused.
    fn oauth_params(&self, token: Option<&str>) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("oauth_consumer_key".to_string(), self.consumer_key.clone());
        params.insert("oauth_nonce".to_string(), generate_nonce());
        params.insert(
            "oauth_signature_method".to_string(),
            SIGNATURE_METHOD.to_string(),
        );
        params.insert(
            "oauth_timestamp".to_string(),
            self.clock.now().timestamp().to_string(),
        );
        params.insert("oauth_version".to_string(), OAUTH_VERSION.to_string());
        if let Some(token) = token {
            params.insert("oauth_token".to_string(), token.to_string());
        }
        params
    }

    /// Merge `extra` into a fresh OAuth parameter set and sign it.
    ///
    /// `token` is `(oauth_token, token_secret)` once an access token is held;
    /// without it the signing key ends in a bare `&`.
    pub fn sign_request(
        &self,
        method: &str,
        url: &str,
        extra: BTreeMap<String, String>,
        token: Option<(&str, &str)>,
    ) -> Result<SignedRequest, InstapaperError> {
        let mut params = self.oauth_params(token.map(|(t, _)| t));
        params.extend(extra);
        let token_secret = token.map(|(_, s)| s).unwrap_or("");
        let signature = sign(method, url, &params, &self.consumer_secret, token_secret)?;
        Ok(SignedRequest { params, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn photos_params() -> BTreeMap<String, String> {
        params(&[
            ("file", "vacation.jpg"),
            ("size", "original"),
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_token", "nnch734d00sl2jdk"),
            ("oauth_nonce", "kllo9940pd9333jh"),
            ("oauth_timestamp", "1191242096"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_version", "1.0"),
        ])
    }

    #[test]
    fn test_percent_encode_reserved_sub_delims() {
        assert_eq!(percent_encode("a!b'c(d)e*f"), "a%21b%27c%28d%29e%2Af");
    }

    #[test]
    fn test_percent_encode_unreserved_and_unsafe() {
        assert_eq!(percent_encode("AZaz09-._~"), "AZaz09-._~");
        assert_eq!(percent_encode("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(percent_encode("zażółć"), "za%C5%BC%C3%B3%C5%82%C4%87");
    }

    #[test]
    fn test_base_string_matches_reference_example() {
        let base = base_string("GET", "http://photos.example.net/photos", &photos_params());
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg\
             %26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh\
             %26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096\
             %26oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn test_signature_matches_reference_example() {
        let signature = sign(
            "GET",
            "http://photos.example.net/photos",
            &photos_params(),
            "kd94hf93k423kf44",
            "pfkkdhi9sl3r4s00",
        )
        .unwrap();
        assert_eq!(signature, "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn test_signing_key_with_empty_token_secret() {
        assert_eq!(signing_key("se cret", ""), "se%20cret&");
    }

    #[test]
    fn test_sign_is_deterministic_and_sensitive() {
        let url = "https://www.instapaper.com/api/1/bookmarks/add";
        let base = params(&[("url", "https://example.com"), ("title", "Title")]);

        let a = sign("POST", url, &base, "cs", "ts").unwrap();
        let b = sign("POST", url, &base, "cs", "ts").unwrap();
        assert_eq!(a, b);

        let mut changed = base.clone();
        changed.insert("title".to_string(), "Title!".to_string());
        assert_ne!(a, sign("POST", url, &changed, "cs", "ts").unwrap());
        assert_ne!(a, sign("POST", url, &base, "cs2", "ts").unwrap());
        assert_ne!(a, sign("POST", url, &base, "cs", "").unwrap());
        assert_ne!(a, sign("GET", url, &base, "cs", "ts").unwrap());
    }

    #[test]
    fn test_nonce_is_fresh_hex() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sign_request_adds_oauth_params_and_excludes_signature() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let signer = Signer::new("ck", "cs", clock);
        let url = "https://www.instapaper.com/api/1/bookmarks/add";

        let signed = signer
            .sign_request(
                "POST",
                url,
                params(&[("url", "https://example.com")]),
                Some(("tok", "tsecret")),
            )
            .unwrap();

        let p = signed.params();
        assert_eq!(p["oauth_consumer_key"], "ck");
        assert_eq!(p["oauth_signature_method"], "HMAC-SHA1");
        assert_eq!(p["oauth_version"], "1.0");
        assert_eq!(p["oauth_timestamp"], "1714564800");
        assert_eq!(p["oauth_token"], "tok");
        assert_eq!(p["url"], "https://example.com");
        assert!(!p.contains_key("oauth_signature"));

        let expected = sign("POST", url, p, "cs", "tsecret").unwrap();
        assert_eq!(signed.signature(), expected);

        let form = signed.into_form();
        let sig = form
            .iter()
            .find(|(k, _)| k == "oauth_signature")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(sig, expected);
    }

    #[test]
    fn test_two_requests_never_share_a_nonce() {
        let clock = Arc::new(ManualClock::default());
        let signer = Signer::new("ck", "cs", clock);
        let a = signer
            .sign_request("POST", "https://x/y", BTreeMap::new(), None)
            .unwrap();
        let b = signer
            .sign_request("POST", "https://x/y", BTreeMap::new(), None)
            .unwrap();

        assert_eq!(a.params()["oauth_timestamp"], b.params()["oauth_timestamp"]);
        assert_ne!(a.params()["oauth_nonce"], b.params()["oauth_nonce"]);
        assert_ne!(a.signature(), b.signature());
    }
}
