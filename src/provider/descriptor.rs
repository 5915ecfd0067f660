//! Per-provider protocol constants.
//!
//! Each supported provider is described by data rather than a type of its own: endpoints, how
//! the ID token issuer is checked, which claim carries the identity, and the extra parameters
//! its authorization endpoint expects. Adding a provider means adding a [`ProviderKind`] and a
//! row of constants here.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific authorization quirks.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{
	_prelude::*,
	identity::{IdentityClaim, ProviderName},
};

/// Supported identity provider families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
	/// Google accounts.
	Google,
	/// Microsoft personal accounts (`consumers` tenant).
	Microsoft,
	/// Sign in with Apple. Present for discovery only; it cannot be configured yet.
	Apple,
}
impl ProviderKind {
	/// Every known kind, in display order.
	pub const ALL: [Self; 3] = [Self::Google, Self::Microsoft, Self::Apple];

	/// Returns the canonical label, also used as the default provider name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Google => "Google",
			Self::Microsoft => "Microsoft",
			Self::Apple => "Apple",
		}
	}

	/// Returns false for stub kinds that cannot complete an exchange.
	pub const fn is_available(self) -> bool {
		!matches!(self, Self::Apple)
	}

	/// Default provider name used before an adapter is configured.
	pub fn default_name(self) -> ProviderName {
		ProviderName::from_static(self.as_str())
	}

	/// Returns the built-in descriptor for this kind.
	pub fn descriptor(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		ProviderDescriptor::builder(self).build()
	}

	pub(crate) const fn authorization_endpoint(self) -> &'static str {
		match self {
			Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
			Self::Microsoft => "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize",
			Self::Apple => "https://appleid.apple.com/auth/authorize",
		}
	}

	pub(crate) const fn token_endpoint(self) -> &'static str {
		match self {
			Self::Google => "https://oauth2.googleapis.com/token",
			Self::Microsoft => "https://login.microsoftonline.com/consumers/oauth2/v2.0/token",
			Self::Apple => "https://appleid.apple.com/auth/token",
		}
	}

	pub(crate) fn issuer_policy(self) -> IssuerPolicy {
		match self {
			Self::Google => IssuerPolicy::Enforce(vec![
				"https://accounts.google.com".into(),
				"accounts.google.com".into(),
			]),
			// Multi-tenant issuers embed the tenant id, so there is no fixed value to compare.
			Self::Microsoft => IssuerPolicy::Skip,
			Self::Apple => IssuerPolicy::Enforce(vec!["https://appleid.apple.com".into()]),
		}
	}

	pub(crate) const fn identity_claim(self) -> IdentityClaim {
		match self {
			Self::Google => IdentityClaim::VerifiedEmail,
			Self::Microsoft | Self::Apple => IdentityClaim::Subject,
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProviderKind {
	type Err = UnknownProviderKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| UnknownProviderKind(s.to_owned()))
	}
}

/// Error returned when a string does not name a known [`ProviderKind`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown identity provider kind `{0}`.")]
pub struct UnknownProviderKind(pub String);

/// How the ID token `iss` claim is validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerPolicy {
	/// `iss` must equal one of the listed values.
	Enforce(Vec<String>),
	/// `iss` is not checked.
	Skip,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges.
	pub token: Url,
}

/// Immutable provider descriptor consumed by adapters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Provider family.
	pub kind: ProviderKind,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// ID token issuer validation.
	pub issuer: IssuerPolicy,
	/// Claim used as the identity record's main identifier.
	pub identity_claim: IdentityClaim,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a builder seeded with the built-in constants for `kind`.
	pub fn builder(kind: ProviderKind) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(kind)
	}
}
