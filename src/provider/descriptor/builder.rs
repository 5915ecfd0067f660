// self
use crate::{
	_prelude::*,
	config::is_secure_endpoint,
	identity::IdentityClaim,
	provider::{IssuerPolicy, ProviderDescriptor, ProviderEndpoints, ProviderKind, ProviderQuirks},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// An endpoint override could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS outside loopback hosts.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Issuer enforcement needs at least one accepted issuer.
	#[error("Issuer enforcement requires at least one accepted issuer.")]
	EmptyIssuerList,
}

/// Builder for [`ProviderDescriptor`] values.
///
/// Unset fields fall back to the built-in constants of the builder's [`ProviderKind`], so a
/// custom tenant only overrides what differs.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Provider family for the descriptor being constructed.
	pub kind: ProviderKind,
	/// Optional authorization endpoint override.
	pub authorization_endpoint: Option<Url>,
	/// Optional token endpoint override.
	pub token_endpoint: Option<Url>,
	/// Optional issuer policy override.
	pub issuer: Option<IssuerPolicy>,
	/// Optional identity claim override.
	pub identity_claim: Option<IdentityClaim>,
	/// Optional quirks override.
	pub quirks: Option<ProviderQuirks>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder for `kind`.
	pub fn new(kind: ProviderKind) -> Self {
		Self {
			kind,
			authorization_endpoint: None,
			token_endpoint: None,
			issuer: None,
			identity_claim: None,
			quirks: None,
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the issuer policy.
	pub fn issuer_policy(mut self, policy: IssuerPolicy) -> Self {
		self.issuer = Some(policy);

		self
	}

	/// Enforces a single accepted issuer.
	pub fn issuer(self, issuer: impl Into<String>) -> Self {
		self.issuer_policy(IssuerPolicy::Enforce(vec![issuer.into()]))
	}

	/// Overrides the identity-carrying claim.
	pub fn identity_claim(mut self, claim: IdentityClaim) -> Self {
		self.identity_claim = Some(claim);

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = Some(quirks);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let kind = self.kind;
		let authorization = match self.authorization_endpoint {
			Some(url) => url,
			None => parse_endpoint("authorization", kind.authorization_endpoint())?,
		};
		let token = match self.token_endpoint {
			Some(url) => url,
			None => parse_endpoint("token", kind.token_endpoint())?,
		};
		let descriptor = ProviderDescriptor {
			kind,
			endpoints: ProviderEndpoints { authorization, token },
			issuer: self.issuer.unwrap_or_else(|| kind.issuer_policy()),
			identity_claim: self.identity_claim.unwrap_or_else(|| kind.identity_claim()),
			quirks: self.quirks.unwrap_or_else(|| ProviderQuirks::for_kind(kind)),
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		if matches!(&self.issuer, IssuerPolicy::Enforce(issuers) if issuers.iter().all(|i| i.trim().is_empty()))
		{
			return Err(ProviderDescriptorError::EmptyIssuerList);
		}

		Ok(())
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|source| ProviderDescriptorError::InvalidEndpoint { endpoint, source })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if is_secure_endpoint(url) {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}
