//! Configuration tree and validated per-provider settings.
//!
//! Hosts load their configuration however they like and hand the crate a JSON tree. The tree
//! is shaped `root -> category (e.g. "OAuth") -> named provider section`, and every provider
//! section carries the keys read by [`ProviderConfig::from_section`].

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError, identity::TokenSecret};

/// Configuration key holding the OAuth client identifier.
pub const CLIENT_ID_KEY: &str = "ClientID";
/// Configuration key holding the OAuth client secret.
pub const CLIENT_SECRET_KEY: &str = "ClientSecret";
/// Configuration key holding the registered redirect URL.
pub const REDIRECT_URL_KEY: &str = "RedirectURL";
/// Configuration key holding the scope requested on sign-in.
pub const SIGN_IN_SCOPE_KEY: &str = "SignInScope";
/// Configuration key holding the scope requested on sign-up.
pub const SIGN_UP_SCOPE_KEY: &str = "SignUpScope";
/// Configuration key holding the JSON Web Key Set URL.
pub const PUBLIC_KEY_URL_KEY: &str = "PublicKeyURL";

/// Node in the host's configuration tree.
///
/// Lookups try the exact key first and fall back to an ASCII case-insensitive match.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigSection {
	key: String,
	path: String,
	value: Value,
}
impl ConfigSection {
	/// Wraps a JSON value as the root of a configuration tree.
	pub fn root(value: Value) -> Self {
		Self { key: String::new(), path: String::new(), value }
	}

	/// Wraps a JSON value as a named section, e.g. a single provider block.
	pub fn named(key: impl Into<String>, value: Value) -> Self {
		let key = key.into();

		Self { path: key.clone(), key, value }
	}

	/// Parses a JSON document into a root section.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(json);
		let value = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::InvalidSection { path: String::new(), source })?;

		Ok(Self::root(value))
	}

	/// Last path segment of this section (empty for the root).
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Colon-separated path from the root to this section.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Raw JSON value backing this section.
	pub fn value(&self) -> &Value {
		&self.value
	}

	/// Returns true when this section can contain child sections.
	pub fn is_object(&self) -> bool {
		self.value.is_object()
	}

	/// Returns a trimmed, non-empty string value for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		match self.lookup(key)? {
			Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
			_ => None,
		}
	}

	/// Returns a boolean value for `key`, accepting `true`/`false` strings.
	pub fn get_bool(&self, key: &str) -> Option<bool> {
		match self.lookup(key)? {
			Value::Bool(flag) => Some(*flag),
			Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
			_ => None,
		}
	}

	/// Returns the child section named `key`.
	pub fn section(&self, key: &str) -> Option<ConfigSection> {
		let Value::Object(map) = &self.value else {
			return None;
		};
		let (found, value) = map
			.get_key_value(key)
			.or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))?;

		Some(self.child(found, value))
	}

	/// Returns every child section in key order.
	pub fn children(&self) -> Vec<ConfigSection> {
		match &self.value {
			Value::Object(map) => map.iter().map(|(k, v)| self.child(k, v)).collect(),
			_ => Vec::new(),
		}
	}

	fn child(&self, key: &str, value: &Value) -> ConfigSection {
		let path = if self.path.is_empty() { key.to_owned() } else { format!("{}:{key}", self.path) };

		ConfigSection { key: key.to_owned(), path, value: value.clone() }
	}

	fn lookup(&self, key: &str) -> Option<&Value> {
		let Value::Object(map) = &self.value else {
			return None;
		};

		map.get(key).or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
	}
}

/// Validated, immutable settings for one provider instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
	client_id: String,
	client_secret: TokenSecret,
	redirect_url: Url,
	sign_in_scope: String,
	sign_up_scope: String,
	public_key_set_url: Url,
}
impl ProviderConfig {
	/// Creates an empty builder.
	pub fn builder() -> ProviderConfigBuilder {
		ProviderConfigBuilder::default()
	}

	/// Reads the provider keys from a configuration section.
	///
	/// Wrongly typed values fail with [`ConfigError::InvalidSection`]; absent or empty values
	/// fail with [`ConfigError::MissingField`].
	pub fn from_section(section: &ConfigSection) -> Result<Self, ConfigError> {
		let raw: RawProviderConfig = serde_path_to_error::deserialize(section.value())
			.map_err(|source| ConfigError::InvalidSection { path: section.path().to_owned(), source })?;

		ProviderConfigBuilder {
			client_id: raw.client_id,
			client_secret: raw.client_secret,
			redirect_url: raw.redirect_url,
			sign_in_scope: raw.sign_in_scope,
			sign_up_scope: raw.sign_up_scope,
			public_key_set_url: raw.public_key_set_url,
		}
		.build()
	}

	/// OAuth client identifier; also the expected ID token audience.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// OAuth client secret.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}

	/// Redirect URL registered with the provider.
	pub fn redirect_url(&self) -> &Url {
		&self.redirect_url
	}

	/// Scope requested for sign-in (`signup == false`) or sign-up (`signup == true`).
	pub fn scope(&self, signup: bool) -> &str {
		if signup { &self.sign_up_scope } else { &self.sign_in_scope }
	}

	/// Scope requested on sign-in.
	pub fn sign_in_scope(&self) -> &str {
		&self.sign_in_scope
	}

	/// Scope requested on sign-up.
	pub fn sign_up_scope(&self) -> &str {
		&self.sign_up_scope
	}

	/// JSON Web Key Set URL.
	pub fn public_key_set_url(&self) -> &Url {
		&self.public_key_set_url
	}
}

/// Builder for [`ProviderConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct ProviderConfigBuilder {
	client_id: Option<String>,
	client_secret: Option<String>,
	redirect_url: Option<String>,
	sign_in_scope: Option<String>,
	sign_up_scope: Option<String>,
	public_key_set_url: Option<String>,
}
impl ProviderConfigBuilder {
	/// Sets the client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(value.into());

		self
	}

	/// Sets the redirect URL.
	pub fn redirect_url(mut self, value: impl Into<String>) -> Self {
		self.redirect_url = Some(value.into());

		self
	}

	/// Sets the sign-in scope.
	pub fn sign_in_scope(mut self, value: impl Into<String>) -> Self {
		self.sign_in_scope = Some(value.into());

		self
	}

	/// Sets the sign-up scope.
	pub fn sign_up_scope(mut self, value: impl Into<String>) -> Self {
		self.sign_up_scope = Some(value.into());

		self
	}

	/// Sets the JSON Web Key Set URL.
	pub fn public_key_set_url(mut self, value: impl Into<String>) -> Self {
		self.public_key_set_url = Some(value.into());

		self
	}

	/// Validates every field and produces the immutable config.
	pub fn build(self) -> Result<ProviderConfig, ConfigError> {
		let client_id = required(CLIENT_ID_KEY, self.client_id)?;
		let client_secret = TokenSecret::new(required(CLIENT_SECRET_KEY, self.client_secret)?);
		let redirect_url = parse_url(REDIRECT_URL_KEY, required(REDIRECT_URL_KEY, self.redirect_url)?)?;
		let sign_in_scope = required(SIGN_IN_SCOPE_KEY, self.sign_in_scope)?;
		let sign_up_scope = required(SIGN_UP_SCOPE_KEY, self.sign_up_scope)?;
		let public_key_set_url =
			parse_url(PUBLIC_KEY_URL_KEY, required(PUBLIC_KEY_URL_KEY, self.public_key_set_url)?)?;

		if !is_secure_endpoint(&public_key_set_url) {
			return Err(ConfigError::InsecureEndpoint {
				endpoint: "key_set",
				url: public_key_set_url.to_string(),
			});
		}

		Ok(ProviderConfig {
			client_id,
			client_secret,
			redirect_url,
			sign_in_scope,
			sign_up_scope,
			public_key_set_url,
		})
	}
}

#[derive(Deserialize)]
struct RawProviderConfig {
	#[serde(default, rename = "ClientID", alias = "ClientId", alias = "clientId")]
	client_id: Option<String>,
	#[serde(default, rename = "ClientSecret", alias = "clientSecret")]
	client_secret: Option<String>,
	#[serde(default, rename = "RedirectURL", alias = "RedirectUrl", alias = "redirectUrl")]
	redirect_url: Option<String>,
	#[serde(default, rename = "SignInScope", alias = "signInScope")]
	sign_in_scope: Option<String>,
	#[serde(default, rename = "SignUpScope", alias = "signUpScope")]
	sign_up_scope: Option<String>,
	#[serde(default, rename = "PublicKeyURL", alias = "PublicKeyUrl", alias = "publicKeyUrl")]
	public_key_set_url: Option<String>,
}

/// Returns true when `url` uses HTTPS or targets a loopback host.
pub(crate) fn is_secure_endpoint(url: &Url) -> bool {
	match url.scheme() {
		"https" => true,
		"http" => match url.host() {
			Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
			Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
			Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
			None => false,
		},
		_ => false,
	}
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	value
		.map(|v| v.trim().to_owned())
		.filter(|v| !v.is_empty())
		.ok_or(ConfigError::MissingField { field })
}

fn parse_url(field: &'static str, value: String) -> Result<Url, ConfigError> {
	Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn google_section() -> ConfigSection {
		ConfigSection::named(
			"Google",
			json!({
				"ClientID": "c1",
				"ClientSecret": "s1",
				"RedirectURL": "https://app/cb",
				"SignInScope": "openid email",
				"SignUpScope": "openid email profile",
				"PublicKeyURL": "https://www.googleapis.com/oauth2/v3/certs",
			}),
		)
	}

	#[test]
	fn section_builds_config() {
		let config =
			ProviderConfig::from_section(&google_section()).expect("Complete section should build.");

		assert_eq!(config.client_id(), "c1");
		assert_eq!(config.client_secret().expose(), "s1");
		assert_eq!(config.scope(false), "openid email");
		assert_eq!(config.scope(true), "openid email profile");
		assert_eq!(config.redirect_url().as_str(), "https://app/cb");
	}

	#[test]
	fn missing_and_empty_fields_are_reported() {
		let err = ProviderConfig::builder()
			.client_id("c1")
			.client_secret("   ")
			.build()
			.expect_err("Blank secret must be rejected.");

		assert!(matches!(err, ConfigError::MissingField { field: CLIENT_SECRET_KEY }));
	}

	#[test]
	fn wrongly_typed_field_reports_path() {
		let section = ConfigSection::named("Google", json!({ "ClientID": 42 }));
		let err = ProviderConfig::from_section(&section).expect_err("Numeric client id must fail.");

		match err {
			ConfigError::InvalidSection { path, source } => {
				assert_eq!(path, "Google");
				assert_eq!(source.path().to_string(), "ClientID");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn key_set_url_requires_https_outside_loopback() {
		let base = ProviderConfig::builder()
			.client_id("c1")
			.client_secret("s1")
			.redirect_url("https://app/cb")
			.sign_in_scope("openid")
			.sign_up_scope("openid");

		assert!(matches!(
			base.clone().public_key_set_url("http://keys.example.com/jwks").build(),
			Err(ConfigError::InsecureEndpoint { endpoint: "key_set", .. })
		));
		base.clone()
			.public_key_set_url("http://127.0.0.1:8080/jwks")
			.build()
			.expect("Loopback key-set URL should be accepted.");
		base.public_key_set_url("http://localhost/jwks")
			.build()
			.expect("Localhost key-set URL should be accepted.");
	}

	#[test]
	fn tree_navigation_tracks_paths() {
		let root = ConfigSection::from_json_str(
			r#"{ "OAuth": { "Google": { "ClientID": "c1", "Enabled": "false" }, "Microsoft": {} } }"#,
		)
		.expect("Fixture JSON should parse.");
		let oauth = root.section("oauth").expect("Category lookup should ignore case.");
		let children = oauth.children();

		assert_eq!(children.len(), 2);
		assert_eq!(children[0].path(), "OAuth:Google");
		assert_eq!(children[0].get("clientid"), Some("c1"));
		assert_eq!(children[0].get_bool("Enabled"), Some(false));
		assert_eq!(children[1].get("ClientID"), None);
	}
}
