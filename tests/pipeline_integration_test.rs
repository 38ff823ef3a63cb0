//! End-to-end pipeline tests.
//!
//! Builds fully signed and encrypted push events with real keys and runs
//! them through verification, decryption, target resolution, and fan-out.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64URL};
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::EncodePrivateKey;
use p256::SecretKey;
use serde::Serialize;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pushbridge::request::RequestContext;
use pushbridge::{payload, pipeline, Config, PushRequest};

const HOSTNAME: &str = "push.example.com";

#[derive(Serialize)]
struct Claims {
    aud: String,
    exp: u64,
    sub: String,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs()
}

fn es256_token(signing_key: &SigningKey, aud: &str) -> String {
    let pem = SecretKey::from(signing_key.clone())
        .to_pkcs8_pem(p256::pkcs8::LineEnding::LF)
        .expect("pkcs8 pem");
    let key = EncodingKey::from_ec_pem(pem.as_bytes()).expect("encoding key");
    jsonwebtoken::encode(
        &Header::new(Algorithm::ES256),
        &Claims {
            aud: aud.to_string(),
            exp: unix_now() + 600,
            sub: "mailto:ops@example.com".to_string(),
        },
        &key,
    )
    .expect("sign token")
}

/// A complete, valid push event plus the config able to decrypt it.
fn build_fixture(message: &str, targets: &[&str]) -> (PushRequest, Config) {
    // Server subscription keys (what keygen would have produced)
    let server_key = SecretKey::random(&mut OsRng);
    let server_public = server_key.public_key().to_encoded_point(false);
    let auth_secret = [0x24u8; 16];

    // Sender side: ephemeral ECDH key, salt, and the encrypted body
    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
    let salt = [0x42u8; 16];
    let ciphertext = payload::encrypt(
        server_public.as_bytes(),
        &auth_secret,
        ephemeral.to_bytes().as_slice(),
        &salt,
        message.as_bytes(),
        0,
    )
    .expect("encrypt");

    // Sender side: VAPID key and signed token
    let vapid_key = SigningKey::random(&mut OsRng);
    let vapid_public = vapid_key.verifying_key().to_encoded_point(false);
    let token = es256_token(&vapid_key, &format!("https://{HOSTNAME}"));

    let mut headers = HashMap::new();
    headers.insert("authorization".to_string(), format!("WebPush {token}"));
    headers.insert(
        "crypto-key".to_string(),
        format!(
            "p256ecdsa={};dh={}",
            BASE64URL.encode(vapid_public.as_bytes()),
            BASE64URL.encode(ephemeral_public.as_bytes())
        ),
    );
    headers.insert(
        "encryption".to_string(),
        format!("salt={}", BASE64URL.encode(salt)),
    );

    let raw_path: String = targets
        .iter()
        .map(|t| format!("/{}", BASE64URL.encode(t.as_bytes())))
        .collect();

    let request = PushRequest {
        raw_path,
        headers,
        body: BASE64.encode(&ciphertext),
        is_base64_encoded: true,
        request_context: RequestContext {
            domain_name: HOSTNAME.to_string(),
        },
    };

    let config = Config {
        private_key: BASE64URL.encode(server_key.to_bytes()),
        shared_secret: BASE64URL.encode(auth_secret),
        dev_delivery: true,
        ..Config::default()
    };

    (request, config)
}

#[tokio::test]
async fn test_valid_event_succeeds() {
    let (request, config) = build_fixture("the decrypted notification", &["topic-a", "topic-b"]);
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 201);
    assert_eq!(response.body, r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn test_valid_event_with_no_targets_succeeds() {
    let (request, config) = build_fixture("nobody listens", &[]);
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 201);
}

#[tokio::test]
async fn test_tampered_body_fails() {
    let (mut request, config) = build_fixture("tamper me", &["topic-a"]);
    let mut data = BASE64.decode(&request.body).expect("body");
    data[5] ^= 0x01;
    request.body = BASE64.encode(data);

    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, r#"{"status":"fail"}"#);
}

#[tokio::test]
async fn test_audience_mismatch_fails() {
    let (mut request, config) = build_fixture("hello", &["topic-a"]);
    request.request_context.domain_name = "other.example.com".to_string();
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_hmac_signed_token_fails() {
    let (mut request, config) = build_fixture("hello", &["topic-a"]);
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            aud: format!("https://{HOSTNAME}"),
            exp: unix_now() + 600,
            sub: String::new(),
        },
        &EncodingKey::from_secret(b"hmac-key"),
    )
    .expect("hmac token");
    request
        .headers
        .insert("authorization".to_string(), format!("WebPush {token}"));

    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_skip_jwt_verify_accepts_junk_token() {
    let (mut request, mut config) = build_fixture("hello", &["topic-a"]);
    request
        .headers
        .insert("authorization".to_string(), "WebPush junk".to_string());

    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500, "junk token must fail normally");

    config.skip_jwt_verify = true;
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 201, "bypass skips verification");
}

#[tokio::test]
async fn test_non_binary_safe_body_fails() {
    let (mut request, config) = build_fixture("hello", &["topic-a"]);
    request.is_base64_encoded = false;
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_undecodable_target_fails() {
    let (mut request, config) = build_fixture("hello", &["topic-a"]);
    request.raw_path = format!("{}/&&($@", request.raw_path);
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_missing_authorization_fails() {
    let (mut request, config) = build_fixture("hello", &["topic-a"]);
    request.headers.remove("authorization");
    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_plaintext_reaches_broker_topics() {
    let server = MockServer::start().await;
    for topic in ["alpha", "beta"] {
        Mock::given(method("POST"))
            .and(path(format!("/{topic}")))
            .and(body_string("broker-bound message"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (request, mut config) = build_fixture("broker-bound message", &["alpha", "beta"]);
    config.dev_delivery = false;
    config.broker_url = server.uri();

    let response = pipeline::handle(&request, &config).await;
    assert_eq!(response.status_code, 201);
}
