//! Inbound push event and response types.
//!
//! The event shape mirrors a serverless function-URL request so events
//! captured from the hosted deployment replay unmodified through the local
//! harness. The HTTP front door adapts live requests into the same shape.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::RelayError;
use crate::headers;
use crate::jwt::VerifiableToken;
use crate::payload::EncryptedPayload;
use crate::targets;

/// One inbound push event.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushRequest {
    /// Request path; each segment is a base64url-encoded target identifier.
    pub raw_path: String,
    /// Request headers, keyed by lowercased name.
    pub headers: HashMap<String, String>,
    /// Request body; standard base64 when `is_base64_encoded` is set.
    pub body: String,
    /// Whether the body was carried with a binary-safe encoding.
    pub is_base64_encoded: bool,
    /// Request metadata supplied by the front door.
    pub request_context: RequestContext,
}

/// Front-door metadata about the request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestContext {
    /// Hostname the push service addressed; becomes the token audience.
    pub domain_name: String,
}

impl PushRequest {
    /// Case-insensitive header lookup. Empty values count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        let value = match self.headers.get(name) {
            Some(value) => Some(value.as_str()),
            None => self
                .headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Builds the signature-verification context: bearer token, audience
    /// (`https://` + hostname), and the verifying key from `crypto-key`.
    pub fn extract_token(&self) -> Result<VerifiableToken, RelayError> {
        let token = headers::bearer_token(self)?;
        let audience = format!("https://{}", self.request_context.domain_name);
        let verifier_key = headers::verifying_key(self)?;
        Ok(VerifiableToken {
            token,
            audience,
            verifier_key,
        })
    }

    /// Builds the decryption context from the request and server secrets.
    ///
    /// The body must be carried binary-safe (standard base64 plus the flag);
    /// a request without the flag is rejected before any header or secret is
    /// inspected. Each remaining field is independently base64url decoded.
    pub fn extract_payload(&self, config: &Config) -> Result<EncryptedPayload, RelayError> {
        if !self.is_base64_encoded {
            // The front door never hands us a raw binary stream.
            return Err(RelayError::NotBinarySafe);
        }

        let sender_public_key = headers::sender_public_key(self)?;
        let salt = headers::salt(self)?;
        let shared_secret = headers::decode_field("shared secret", &config.shared_secret)?;
        let private_key = headers::decode_field("private key", &config.private_key)?;
        let data = BASE64
            .decode(&self.body)
            .map_err(|source| RelayError::NotBase64Encoded {
                field: "body",
                source,
            })?;

        Ok(EncryptedPayload {
            shared_secret,
            private_key,
            sender_public_key,
            salt,
            data,
        })
    }

    /// Decodes the delivery targets from the request path.
    pub fn extract_targets(&self) -> Result<Vec<String>, RelayError> {
        targets::resolve(&self.raw_path)
    }
}

/// JSON status response handed back to the push service.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// HTTP status code: 201 on full success, 500 otherwise.
    pub status_code: u16,
    /// JSON body, `{"status": "ok"|"fail"}`.
    pub body: String,
}

impl PushResponse {
    /// Encodes `{"status": msg}` with the given status code.
    pub fn new(status_code: u16, msg: &str) -> Self {
        let body = serde_json::json!({ "status": msg }).to_string();
        Self { status_code, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;

    fn b64url(value: &str) -> String {
        BASE64URL.encode(value.as_bytes())
    }

    fn valid_config() -> Config {
        Config {
            private_key: b64url("ValidPrivateKey"),
            shared_secret: b64url("ValidSharedSecret"),
            ..Config::default()
        }
    }

    fn payload_request() -> PushRequest {
        let mut request = PushRequest {
            is_base64_encoded: true,
            body: BASE64.encode(b"ValidBody"),
            ..PushRequest::default()
        };
        request.headers.insert(
            "encryption".to_string(),
            format!("salt={}", b64url("ValidSalt")),
        );
        request.headers.insert(
            "crypto-key".to_string(),
            format!("dh={}", b64url("ValidCryptoKey")),
        );
        request
    }

    #[test]
    fn test_extract_payload_succeeds() {
        let payload = payload_request().extract_payload(&valid_config()).unwrap();
        assert_eq!(payload.data, b"ValidBody");
        assert_eq!(payload.salt, b"ValidSalt");
        assert_eq!(payload.sender_public_key, b"ValidCryptoKey");
        assert_eq!(payload.private_key, b"ValidPrivateKey");
        assert_eq!(payload.shared_secret, b"ValidSharedSecret");
    }

    #[test]
    fn test_extract_payload_rejects_non_binary_safe_first() {
        // Headers are garbage too, but the binary-safe check must win.
        let mut request = payload_request();
        request.is_base64_encoded = false;
        request
            .headers
            .insert("encryption".to_string(), "garbage".to_string());
        assert!(matches!(
            request.extract_payload(&valid_config()),
            Err(RelayError::NotBinarySafe)
        ));
    }

    #[test]
    fn test_extract_payload_rejects_invalid_body() {
        let mut request = payload_request();
        request.body = "**$(#".to_string();
        match request.extract_payload(&valid_config()) {
            Err(RelayError::NotBase64Encoded { field, .. }) => assert_eq!(field, "body"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_payload_rejects_invalid_private_key() {
        let mut config = valid_config();
        config.private_key = "$*))".to_string();
        match payload_request().extract_payload(&config) {
            Err(RelayError::NotBase64Encoded { field, .. }) => assert_eq!(field, "private key"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_payload_rejects_invalid_shared_secret() {
        let mut config = valid_config();
        config.shared_secret = "$*((".to_string();
        match payload_request().extract_payload(&config) {
            Err(RelayError::NotBase64Encoded { field, .. }) => assert_eq!(field, "shared secret"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_payload_rejects_bad_salt_header() {
        for (value, check) in [
            ("", "missing"),
            ("foobar", "not key/val"),
            ("salt=8#$*)#$", "not base64"),
        ] {
            let mut request = payload_request();
            request
                .headers
                .insert("encryption".to_string(), value.to_string());
            let result = request.extract_payload(&valid_config());
            assert!(result.is_err(), "salt case '{check}' should fail");
        }
    }

    #[test]
    fn test_extract_token_builds_audience_from_hostname() {
        use p256::ecdsa::SigningKey;
        use p256::elliptic_curve::rand_core::OsRng;

        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);

        let mut request = PushRequest::default();
        request.request_context.domain_name = "foo.com".to_string();
        request.headers.insert(
            "authorization".to_string(),
            "WebPush MyToken".to_string(),
        );
        request.headers.insert(
            "crypto-key".to_string(),
            format!("p256ecdsa={}", BASE64URL.encode(point.as_bytes())),
        );

        let vtoken = request.extract_token().unwrap();
        assert_eq!(vtoken.token, "MyToken");
        assert_eq!(vtoken.audience, "https://foo.com");
        assert_eq!(vtoken.verifier_key.to_encoded_point(false), point);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut request = PushRequest::default();
        request
            .headers
            .insert("Authorization".to_string(), "WebPush t".to_string());
        assert_eq!(request.header("authorization"), Some("WebPush t"));
        assert_eq!(request.header("AUTHORIZATION"), Some("WebPush t"));
    }

    #[test]
    fn test_empty_header_counts_as_absent() {
        let mut request = PushRequest::default();
        request
            .headers
            .insert("encryption".to_string(), String::new());
        assert_eq!(request.header("encryption"), None);
    }

    #[test]
    fn test_event_deserializes_from_camel_case_json() {
        let event = r#"{
            "rawPath": "/YWJj",
            "headers": {"authorization": "WebPush t"},
            "body": "Zm9v",
            "isBase64Encoded": true,
            "requestContext": {"domainName": "push.example.com"}
        }"#;
        let request: PushRequest = serde_json::from_str(event).unwrap();
        assert_eq!(request.raw_path, "/YWJj");
        assert!(request.is_base64_encoded);
        assert_eq!(request.request_context.domain_name, "push.example.com");
    }

    #[test]
    fn test_response_encodes_status_json() {
        let response = PushResponse::new(201, "ok");
        assert_eq!(response.status_code, 201);
        assert_eq!(response.body, r#"{"status":"ok"}"#);
    }
}
