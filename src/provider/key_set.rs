//! JSON Web Key Set loading.
//!
//! Only RSA signing keys usable with RS256 are kept. A key set is immutable once loaded;
//! rotation replaces the whole set.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey};
use oauth2::{
	AsyncHttpClient,
	http::{Method, Request, header::ACCEPT},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{StatusSlot, TokenHttpClient},
};

/// RSA public key selected by its `kid`.
#[derive(Clone)]
pub struct VerificationKey {
	/// Key identifier.
	pub key_id: String,
	/// Base64url-encoded RSA modulus (`n`).
	pub modulus: String,
	/// Base64url-encoded RSA public exponent (`e`).
	pub exponent: String,
	/// Signature algorithm the key is used with.
	pub algorithm: Algorithm,
	decoding_key: DecodingKey,
}
impl VerificationKey {
	/// Decoding key ready for signature verification.
	pub fn decoding_key(&self) -> &DecodingKey {
		&self.decoding_key
	}
}
impl Debug for VerificationKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VerificationKey")
			.field("key_id", &self.key_id)
			.field("algorithm", &self.algorithm)
			.finish_non_exhaustive()
	}
}

/// Immutable `kid` to key map parsed from a JWKS document.
#[derive(Clone, Debug, Default)]
pub struct KeySet {
	keys: HashMap<String, Arc<VerificationKey>>,
}
impl KeySet {
	/// Parses a JWKS document.
	///
	/// Keys that are not RSA, not meant for signatures, or bound to an algorithm other than
	/// RS256 are skipped. A usable key without `n`/`e`, with undecodable components, or whose
	/// `kid` repeats an earlier key fails the whole load.
	pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);
		let document: JwkSetDocument = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::KeySetParse { source })?;
		let mut keys = HashMap::with_capacity(document.keys.len());

		for jwk in document.keys {
			let Some(kid) = jwk.usable_kid() else {
				continue;
			};
			let key = jwk.into_key(kid)?;

			if keys.contains_key(&key.key_id) {
				return Err(ConfigError::InvalidKey {
					kid: key.key_id,
					reason: "key identifier appears more than once".into(),
				});
			}

			keys.insert(key.key_id.clone(), Arc::new(key));
		}

		Ok(Self { keys })
	}

	/// Returns the key registered under `kid`.
	pub fn get(&self, kid: &str) -> Option<&Arc<VerificationKey>> {
		self.keys.get(kid)
	}

	/// Returns the number of usable keys.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Returns true when no usable key was loaded.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Returns the loaded key identifiers in sorted order.
	pub fn key_ids(&self) -> Vec<&str> {
		let mut ids = self.keys.keys().map(String::as_str).collect::<Vec<_>>();

		ids.sort_unstable();

		ids
	}

	/// Downloads and parses the key set at `url`.
	pub(crate) async fn fetch<C>(http_client: &C, url: &Url, timeout: Duration) -> Result<Self, ConfigError>
	where
		C: ?Sized + TokenHttpClient,
	{
		let status = StatusSlot::default();
		let handle = http_client.handle(status.clone());
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(ACCEPT, "application/json")
			.body(Vec::new())?;
		let unavailable = |reason: String, status: Option<u16>| ConfigError::KeySetUnavailable {
			url: url.to_string(),
			reason,
			status,
		};
		let response = match tokio::time::timeout(timeout, handle.call(request)).await {
			Ok(Ok(response)) => response,
			Ok(Err(e)) =>
				return Err(unavailable(e.to_string(), status.get())),
			Err(_) => return Err(unavailable(format!("request timed out after {timeout:?}"), None)),
		};
		let status = response.status();

		if !status.is_success() {
			return Err(unavailable(format!("unexpected HTTP status {status}"), Some(status.as_u16())));
		}

		Self::from_json(response.body())
	}
}

#[derive(Deserialize)]
struct JwkSetDocument {
	keys: Vec<RawJwk>,
}

#[derive(Deserialize)]
struct RawJwk {
	kty: String,
	#[serde(default)]
	kid: Option<String>,
	#[serde(default)]
	n: Option<String>,
	#[serde(default)]
	e: Option<String>,
	#[serde(default)]
	alg: Option<String>,
	#[serde(default, rename = "use")]
	key_use: Option<String>,
}
impl RawJwk {
	// Keys without a `kid` can never be selected by a token header.
	fn usable_kid(&self) -> Option<String> {
		if self.kty != "RSA" {
			return None;
		}
		if self.key_use.as_deref().is_some_and(|key_use| key_use != "sig") {
			return None;
		}
		if self.alg.as_deref().is_some_and(|alg| alg != "RS256") {
			return None;
		}

		self.kid.clone().filter(|kid| !kid.is_empty())
	}

	fn into_key(self, kid: String) -> Result<VerificationKey, ConfigError> {
		let invalid = |reason: &str| ConfigError::InvalidKey { kid: kid.clone(), reason: reason.into() };
		let modulus = self.n.filter(|n| !n.is_empty()).ok_or_else(|| invalid("missing modulus `n`"))?;
		let exponent =
			self.e.filter(|e| !e.is_empty()).ok_or_else(|| invalid("missing exponent `e`"))?;
		let decoding_key = DecodingKey::from_rsa_components(&modulus, &exponent)
			.map_err(|e| invalid(&format!("RSA components cannot be decoded ({e})")))?;

		Ok(VerificationKey { key_id: kid, modulus, exponent, algorithm: Algorithm::RS256, decoding_key })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	// Public components of a 2048-bit test key.
	const N: &str = "yUAO1ENYlfOrnAQq-A03S41uHJqj0lkx8eEbOaXfTxCCMMjvhnfm9CP1_KgAqo34eoytAIrND6qIgTHT6q2O6MSbRqTLilHBrvoFpgINJVgmbN5FS-YDAoQrMfak29Cx3XaNswVqL6Lw3bRxBoQpdziueQEcmnoBych5mCA-ddoA6AAXHtkMWMUZobNNXEjxw-0mWGY-KMCifM7DsCK_eNM13kxf37s1e9lgY2g4fmvqW26NP_JyVZJVTMHP-0rxCtFOh1Fgm6Z7D0WZz6_FArLoiMOiU7LvLo2jyt8jgEOp0SGXkxRDbfIiTrLYdeRAKINrP69C8WX_zh8Jr7i0dQ";
	const E: &str = "AQAB";

	fn parse(value: serde_json::Value) -> Result<KeySet, ConfigError> {
		KeySet::from_json(value.to_string().as_bytes())
	}

	#[test]
	fn skips_keys_that_cannot_sign_rs256() {
		let set = parse(json!({ "keys": [
			{ "kty": "RSA", "kid": "k1", "n": N, "e": E, "alg": "RS256", "use": "sig" },
			{ "kty": "RSA", "kid": "enc", "n": N, "e": E, "use": "enc" },
			{ "kty": "RSA", "kid": "ps", "n": N, "e": E, "alg": "PS256" },
			{ "kty": "EC", "kid": "ec", "crv": "P-256", "x": "x", "y": "y" },
			{ "kty": "RSA", "n": N, "e": E },
		]}))
		.expect("Key set with one usable key should parse.");

		assert_eq!(set.len(), 1);
		assert_eq!(set.key_ids(), vec!["k1"]);
		assert_eq!(set.get("k1").map(|key| key.algorithm), Some(Algorithm::RS256));
		assert!(set.get("enc").is_none());
	}

	#[test]
	fn empty_document_yields_empty_set() {
		let set = parse(json!({ "keys": [] })).expect("Empty key set should parse.");

		assert!(set.is_empty());
	}

	#[test]
	fn missing_components_fail_the_load() {
		let err = parse(json!({ "keys": [{ "kty": "RSA", "kid": "k1", "e": E }] }))
			.expect_err("Key without modulus must fail.");

		assert!(matches!(err, ConfigError::InvalidKey { ref kid, .. } if kid == "k1"));
	}

	#[test]
	fn duplicate_kid_fails_the_load() {
		let err = parse(json!({ "keys": [
			{ "kty": "RSA", "kid": "k1", "n": N, "e": E },
			{ "kty": "RSA", "kid": "k1", "n": N, "e": E },
		]}))
		.expect_err("Duplicate kid must fail.");

		assert!(matches!(err, ConfigError::InvalidKey { .. }));
	}

	#[test]
	fn non_jwks_body_is_a_parse_error() {
		let err = KeySet::from_json(br#"{ "keys": "nope" }"#).expect_err("Malformed JWKS must fail.");

		match err {
			ConfigError::KeySetParse { source } => assert_eq!(source.path().to_string(), "keys"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn debug_output_hides_key_material() {
		let set = parse(json!({ "keys": [{ "kty": "RSA", "kid": "k1", "n": N, "e": E }] }))
			.expect("Key set should parse.");
		let rendered = format!("{:?}", set.get("k1").expect("Key should be present."));

		assert!(rendered.contains("k1"));
		assert!(!rendered.contains(N));
	}
}
