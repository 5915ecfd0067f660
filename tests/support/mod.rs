//! Shared fixtures for integration tests: an RSA signing key, its JWKS, and mock providers.

#![allow(dead_code)]

// std
use std::time::{Duration, SystemTime, UNIX_EPOCH};
// crates.io
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
// self
use oidc_federation::{
	config::ProviderConfig,
	http::ReqwestHttpClient,
	identity::ProviderName,
	oauth::ReqwestTransportErrorMapper,
	provider::{ProviderDescriptor, ProviderKind, ReqwestProviderAdapter},
	registry::{ProviderRegistry, ReqwestProviderFactory},
	reqwest::{Client, redirect::Policy},
	url::Url,
};

pub const CLIENT_ID: &str = "c1";
pub const CLIENT_SECRET: &str = "s1";
pub const KID: &str = "fixture-key";
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";

const PRIVATE_KEY_PEM: &str = include_str!("test_rsa_key.pem");
const MODULUS: &str = "yUAO1ENYlfOrnAQq-A03S41uHJqj0lkx8eEbOaXfTxCCMMjvhnfm9CP1_KgAqo34eoytAIrND6qIgTHT6q2O6MSbRqTLilHBrvoFpgINJVgmbN5FS-YDAoQrMfak29Cx3XaNswVqL6Lw3bRxBoQpdziueQEcmnoBych5mCA-ddoA6AAXHtkMWMUZobNNXEjxw-0mWGY-KMCifM7DsCK_eNM13kxf37s1e9lgY2g4fmvqW26NP_JyVZJVTMHP-0rxCtFOh1Fgm6Z7D0WZz6_FArLoiMOiU7LvLo2jyt8jgEOp0SGXkxRDbfIiTrLYdeRAKINrP69C8WX_zh8Jr7i0dQ";
const EXPONENT: &str = "AQAB";

/// JWKS document publishing the fixture key under `kid`.
pub fn jwks(kid: &str) -> Value {
	json!({
		"keys": [{
			"kty": "RSA",
			"use": "sig",
			"alg": "RS256",
			"kid": kid,
			"n": MODULUS,
			"e": EXPONENT,
		}]
	})
}

/// Seconds since the Unix epoch.
pub fn now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the Unix epoch.")
		.as_secs()
}

/// Claims accepted by a Google adapter configured with [`CLIENT_ID`].
pub fn google_claims() -> Value {
	let now = now();

	json!({
		"iss": GOOGLE_ISSUER,
		"aud": CLIENT_ID,
		"sub": "108204268033311374519",
		"email": "ada@example.com",
		"email_verified": true,
		"name": "Ada Lovelace",
		"picture": "https://example.com/ada.png",
		"iat": now,
		"exp": now + 600,
	})
}

/// Signs `claims` with the fixture key, stamping `kid` into the header.
pub fn sign(claims: &Value, kid: Option<&str>) -> String {
	let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes())
		.expect("Fixture RSA key should load.");
	let mut header = Header::new(Algorithm::RS256);

	header.kid = kid.map(str::to_owned);

	jsonwebtoken::encode(&header, claims, &key).expect("Fixture claims should sign.")
}

/// Successful token endpoint body carrying `id_token`.
pub fn token_body(id_token: &str) -> String {
	json!({
		"access_token": "access-it",
		"token_type": "bearer",
		"expires_in": 3600,
		"id_token": id_token,
	})
	.to_string()
}

/// Serves the fixture JWKS on `/jwks`.
pub async fn mock_jwks(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body(jwks(KID).to_string());
		})
		.await
}

/// Serves a successful token response on `/token`.
pub async fn mock_token<'s>(server: &'s MockServer, id_token: &str) -> httpmock::Mock<'s> {
	let body = token_body(id_token);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

/// Plain-HTTP URL on the mock server, which accepts TLS and cleartext on the same port.
pub fn http_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&format!("http://{}{path}", server.address()))
		.expect("Mock server URL should parse.")
}

/// Transport that trusts the self-signed certificate `httpmock` serves and, like the crate's
/// own client, never follows redirects.
pub fn http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Registry whose factory uses [`http_client`].
pub fn registry() -> ProviderRegistry {
	ProviderRegistry::new(ReqwestProviderFactory::with_http_client(
		http_client(),
		ReqwestTransportErrorMapper,
	))
}

/// Provider settings pointing the key-set URL at the mock server.
pub fn config(server: &MockServer) -> ProviderConfig {
	ProviderConfig::builder()
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.redirect_url("https://app/cb")
		.sign_in_scope("openid email")
		.sign_up_scope("openid email profile")
		.public_key_set_url(server.url("/jwks"))
		.build()
		.expect("Provider config fixture should build.")
}

/// Built-in descriptor for `kind` with the token endpoint moved onto the mock server.
pub fn descriptor(server: &MockServer, kind: ProviderKind) -> ProviderDescriptor {
	ProviderDescriptor::builder(kind)
		.token_endpoint(url(server, "/token"))
		.build()
		.expect("Descriptor fixture should build.")
}

pub fn adapter(server: &MockServer, kind: ProviderKind) -> ReqwestProviderAdapter {
	ReqwestProviderAdapter::with_http_client(
		descriptor(server, kind),
		http_client(),
		ReqwestTransportErrorMapper,
	)
}

pub fn name(value: &str) -> ProviderName {
	ProviderName::new(value).expect("Provider name fixture should be valid.")
}

/// Short timeout used by tests that exercise slow endpoints.
pub const SHORT_TIMEOUT: Duration = Duration::from_millis(200);
