//! Federation-wide error types shared by adapters, the registry, and configuration.

// self
use crate::{
	_prelude::*,
	identity::NameError,
	provider::{ProviderDescriptorError, ProviderKind},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical federation error exposed by public APIs.
///
/// Detailed variants are meant for audit logs. HTTP-facing wrappers should surface
/// [`Error::public_message`] instead so callers cannot tell an unknown key from a bad
/// signature.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem or unusable key set.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// ID token failed structural, cryptographic, or claim validation.
	#[error(transparent)]
	Verification(#[from] VerificationError),
	/// Registry mutation conflict or lookup failure.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Operation attempted before the adapter finished configuration.
	#[error("Identity provider `{provider}` is not configured.")]
	NotConfigured {
		/// Name of the adapter that rejected the call.
		provider: String,
	},
	/// Token endpoint rejected the code or returned an unusable body.
	#[error("Failed to exchange code for token: {reason}.")]
	TokenExchangeFailed {
		/// Provider- or adapter-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Caller cancelled the in-flight exchange.
	#[error("Identity exchange was cancelled.")]
	Cancelled,
}
impl Error {
	/// Flattened classification suitable for audit records and metrics labels.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Configuration,
			Self::Verification(e) => e.kind(),
			Self::Registry(RegistryError::DuplicateProvider { .. }) => ErrorKind::DuplicateProvider,
			Self::Registry(RegistryError::NotFound { .. }) => ErrorKind::NotFound,
			Self::Registry(RegistryError::Declined { .. }) => ErrorKind::Declined,
			Self::Transport(_) => ErrorKind::Transport,
			Self::NotConfigured { .. } => ErrorKind::NotConfigured,
			Self::TokenExchangeFailed { .. } => ErrorKind::TokenExchangeFailed,
			Self::Cancelled => ErrorKind::Cancelled,
		}
	}

	/// Coarse message that is safe to show end users.
	///
	/// Every token verification failure collapses into the same sentence.
	pub fn public_message(&self) -> &'static str {
		match self.kind() {
			ErrorKind::MalformedToken
			| ErrorKind::MissingKeyId
			| ErrorKind::UnknownKey
			| ErrorKind::SignatureInvalid
			| ErrorKind::ClaimMismatch
			| ErrorKind::IdentityClaimMissing
			| ErrorKind::TokenExchangeFailed => "Sign-in could not be completed. Please try again.",
			ErrorKind::Transport => "The identity provider is unreachable. Please try again later.",
			ErrorKind::Cancelled => "Sign-in was cancelled.",
			ErrorKind::NotFound | ErrorKind::Declined => "The requested sign-in method is unavailable.",
			ErrorKind::Configuration
			| ErrorKind::NotConfigured
			| ErrorKind::DuplicateProvider => "Sign-in is temporarily unavailable.",
		}
	}
}

/// Flat error classification mirrored by every [`Error`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Malformed or incomplete configuration, or unreachable key-set endpoint.
	Configuration,
	/// Adapter used before configuration completed.
	NotConfigured,
	/// Token endpoint failure or missing `id_token`.
	TokenExchangeFailed,
	/// ID token does not have three segments or cannot be decoded.
	MalformedToken,
	/// ID token header has no `kid`.
	MissingKeyId,
	/// `kid` is absent from the cached key set.
	UnknownKey,
	/// Signature did not verify.
	SignatureInvalid,
	/// Issuer, audience, or lifetime claims did not validate.
	ClaimMismatch,
	/// Verified token lacks the provider's identity-carrying claim.
	IdentityClaimMissing,
	/// Provider name already registered.
	DuplicateProvider,
	/// Provider name not registered.
	NotFound,
	/// Factory declined to build a provider from configuration.
	Declined,
	/// Network failure or timeout.
	Transport,
	/// Caller cancelled the exchange.
	Cancelled,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Configuration => "configuration",
			Self::NotConfigured => "not_configured",
			Self::TokenExchangeFailed => "token_exchange_failed",
			Self::MalformedToken => "malformed_token",
			Self::MissingKeyId => "missing_key_id",
			Self::UnknownKey => "unknown_key",
			Self::SignatureInvalid => "signature_invalid",
			Self::ClaimMismatch => "claim_mismatch",
			Self::IdentityClaimMissing => "identity_claim_missing",
			Self::DuplicateProvider => "duplicate_provider",
			Self::NotFound => "not_found",
			Self::Declined => "declined",
			Self::Transport => "transport",
			Self::Cancelled => "cancelled",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and key-set failures raised while setting up adapters.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A required configuration field is absent or empty.
	#[error("Configuration field `{field}` is missing or empty.")]
	MissingField {
		/// Configuration key that failed validation.
		field: &'static str,
	},
	/// A configured URL cannot be parsed.
	#[error("Configuration field `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Configuration key that failed validation.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint must use HTTPS outside loopback hosts.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A configuration section has the wrong shape.
	#[error("Configuration section `{path}` is malformed.")]
	InvalidSection {
		/// Dotted path of the offending section.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider name failed validation.
	#[error(transparent)]
	InvalidName(#[from] NameError),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] ProviderDescriptorError),
	/// Provider kind is a stub and cannot be configured.
	#[error("Identity provider kind `{kind}` is not available.")]
	UnsupportedProvider {
		/// Unavailable provider kind.
		kind: ProviderKind,
	},
	/// Key-set endpoint could not be reached or returned a non-success status.
	#[error("JSON Web Key Set cannot be fetched from {url}: {reason}.")]
	KeySetUnavailable {
		/// Key-set URL that failed.
		url: String,
		/// Human-readable failure summary.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Key-set document is not valid JSON Web Key Set JSON.
	#[error("JSON Web Key Set is malformed.")]
	KeySetParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A key inside the key set is unusable.
	#[error("JSON Web Key `{kid}` is invalid: {reason}.")]
	InvalidKey {
		/// Key identifier of the offending entry.
		kid: String,
		/// Human-readable failure summary.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// ID token verification failures.
///
/// Each variant is an expected, handleable outcome; none of them indicate misuse.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VerificationError {
	/// Token does not have exactly three segments or a segment cannot be decoded.
	#[error("ID token is malformed: {reason}.")]
	MalformedToken {
		/// Human-readable failure summary.
		reason: String,
	},
	/// Token header does not carry a `kid`.
	#[error("ID token header does not contain a key identifier.")]
	MissingKeyId,
	/// Token `kid` is not present in the cached key set.
	#[error("ID token key `{kid}` is not in the provider key set.")]
	UnknownKey {
		/// Key identifier taken from the token header.
		kid: String,
	},
	/// Signature did not verify against the selected key.
	#[error("ID token signature is invalid.")]
	SignatureInvalid,
	/// A validated claim did not match expectations.
	#[error("ID token claim `{claim}` failed validation.")]
	ClaimMismatch {
		/// Claim that failed validation.
		claim: String,
	},
	/// Token verified but lacks the identity-carrying claim.
	#[error("ID token does not contain the identity claim `{claim}`.")]
	IdentityClaimMissing {
		/// Claim the provider uses as its main identifier.
		claim: &'static str,
	},
}
impl VerificationError {
	/// Returns the flattened [`ErrorKind`] for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MalformedToken { .. } => ErrorKind::MalformedToken,
			Self::MissingKeyId => ErrorKind::MissingKeyId,
			Self::UnknownKey { .. } => ErrorKind::UnknownKey,
			Self::SignatureInvalid => ErrorKind::SignatureInvalid,
			Self::ClaimMismatch { .. } => ErrorKind::ClaimMismatch,
			Self::IdentityClaimMissing { .. } => ErrorKind::IdentityClaimMissing,
		}
	}

	pub(crate) fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedToken { reason: reason.into() }
	}
}

/// Registry mutation and lookup failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RegistryError {
	/// A provider with the same name is already registered.
	#[error("Identity provider `{name}` already exists.")]
	DuplicateProvider {
		/// Conflicting provider name.
		name: String,
	},
	/// No provider with the given name is registered.
	#[error("Identity provider `{name}` does not exist.")]
	NotFound {
		/// Requested provider name.
		name: String,
	},
	/// The factory declined to build a provider from the supplied section.
	#[error("Configuration section does not describe a usable provider: {reason}.")]
	Declined {
		/// Factory-supplied reason string.
		reason: String,
	},
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label (`token`, `key_set`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// Request did not complete within the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out after {timeout:?}.")]
	Timeout {
		/// Endpoint label (`token`, `key_set`).
		endpoint: &'static str,
		/// Timeout that elapsed.
		timeout: Duration,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}
