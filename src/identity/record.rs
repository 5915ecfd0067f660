//! Normalized identity records extracted from verified ID tokens.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::VerificationError, identity::TokenSecret};

/// Verified ID token claims keyed by claim name.
pub type Claims = Map<String, Value>;

/// Claim a provider uses as the stable, identity-carrying value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityClaim {
	/// The `email` claim, rejected when `email_verified` is explicitly false.
	VerifiedEmail,
	/// The `sub` claim.
	Subject,
}
impl IdentityClaim {
	/// Returns the JWT claim name backing this identifier.
	pub const fn claim_name(self) -> &'static str {
		match self {
			Self::VerifiedEmail => "email",
			Self::Subject => "sub",
		}
	}

	fn extract(self, claims: &Claims) -> Option<String> {
		let value = string_claim(claims, self.claim_name())?;

		if matches!(self, Self::VerifiedEmail) && email_verified(claims) == Some(false) {
			return None;
		}

		Some(value)
	}
}

/// Identity produced by a successful code exchange.
///
/// Records are only built from tokens whose signature and claims already verified, and
/// never partially: extraction either yields a full record or an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
	/// Display name (`name`).
	pub name: Option<String>,
	/// Email address (`email`).
	pub email: Option<String>,
	/// Phone number (`phone_number`).
	pub phone: Option<String>,
	/// Provider username (`preferred_username`).
	pub username: Option<String>,
	/// Stable identity-carrying value selected by the provider's [`IdentityClaim`].
	pub main_identifier: String,
	/// Avatar URL (`picture`).
	#[serde(rename = "pictureURL")]
	pub picture_url: Option<String>,
	/// The verified ID token, retained for audit and debugging.
	#[serde(skip)]
	pub raw_token: TokenSecret,
}
impl IdentityRecord {
	/// Builds a record from verified claims.
	pub fn from_claims(
		claims: &Claims,
		identity_claim: IdentityClaim,
		raw_token: TokenSecret,
	) -> Result<Self, VerificationError> {
		let main_identifier = identity_claim
			.extract(claims)
			.ok_or(VerificationError::IdentityClaimMissing { claim: identity_claim.claim_name() })?;

		Ok(Self {
			name: string_claim(claims, "name"),
			email: string_claim(claims, "email"),
			phone: string_claim(claims, "phone_number"),
			username: string_claim(claims, "preferred_username"),
			main_identifier,
			picture_url: string_claim(claims, "picture"),
			raw_token,
		})
	}
}

fn string_claim(claims: &Claims, name: &str) -> Option<String> {
	match claims.get(name)? {
		Value::String(s) if !s.trim().is_empty() => Some(s.to_owned()),
		_ => None,
	}
}

// Some issuers encode `email_verified` as a string.
fn email_verified(claims: &Claims) -> Option<bool> {
	match claims.get("email_verified")? {
		Value::Bool(flag) => Some(*flag),
		Value::String(s) => s.parse().ok(),
		_ => None,
	}
}
