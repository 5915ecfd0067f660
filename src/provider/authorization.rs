//! Authorization redirect construction and `state` handling.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	config::ProviderConfig,
	identity::{ProviderName, STATE_SEPARATOR},
	provider::{AuthorizeParam, ProviderDescriptor},
};

const NONCE_LEN: usize = 32;

/// Sign-in redirect returned by [`create_authorization_request`](crate::provider::IdentityProvider::create_authorization_request).
///
/// Hosts persist `state` (and `nonce`, when present) in the user's session and compare it
/// with the value returned on the callback before exchanging the code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
	/// Fully-formed authorization URL the user agent should be redirected to.
	pub url: Url,
	/// Opaque `<ProviderName>:<uuid>` value that must round-trip through the redirect.
	pub state: String,
	/// Random nonce sent to providers that take one.
	///
	/// The exchange does not compare it with the ID token's `nonce` claim. Hosts that want
	/// replay protection read the claim from [`IdentityRecord::raw_token`](crate::identity::IdentityRecord::raw_token).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
}
impl AuthorizationRequest {
	/// Returns true when `returned_state` matches the value issued with this request.
	pub fn matches_state(&self, returned_state: &str) -> bool {
		self.state == returned_state
	}
}

/// Splits an authorization `state` into its provider name and random suffix.
///
/// Returns `None` when the separator is missing or either side is empty.
pub fn split_state(state: &str) -> Option<(&str, &str)> {
	let (provider, random) = state.split_once(STATE_SEPARATOR)?;

	if provider.is_empty() || random.is_empty() { None } else { Some((provider, random)) }
}

pub(crate) fn build_request(
	name: &ProviderName,
	descriptor: &ProviderDescriptor,
	config: &ProviderConfig,
	signup: bool,
) -> AuthorizationRequest {
	let state = generate_state(name);
	let nonce = descriptor.quirks.requires_nonce().then(|| random_string(NONCE_LEN));
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", config.client_id());
	pairs.append_pair("redirect_uri", config.redirect_url().as_str());
	pairs.append_pair("scope", config.scope(signup));
	pairs.append_pair("response_type", "code");

	for param in &descriptor.quirks.authorize_params {
		match param {
			AuthorizeParam::Static { name, value } => {
				pairs.append_pair(name, value);
			},
			AuthorizeParam::Nonce =>
				if let Some(nonce) = nonce.as_deref() {
					pairs.append_pair("nonce", nonce);
				},
		}
	}

	pairs.append_pair("state", &state);

	drop(pairs);

	AuthorizationRequest { url, state, nonce }
}

fn generate_state(name: &ProviderName) -> String {
	let mut bytes = [0_u8; 16];

	rand::rng().fill(&mut bytes);

	let id = uuid::Builder::from_random_bytes(bytes).into_uuid();

	format!("{name}{STATE_SEPARATOR}{id}")
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
