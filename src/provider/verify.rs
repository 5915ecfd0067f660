//! ID token verification.
//!
//! The pipeline is ordered so that cheap structural checks run first and no signature math
//! happens for a `kid` the key set does not know.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Validation, errors::ErrorKind as JwtErrorKind};
// self
use crate::{
	_prelude::*,
	error::VerificationError,
	identity::{Claims, IdentityClaim, IdentityRecord, TokenSecret},
	provider::{IssuerPolicy, KeySet},
};

const LEEWAY_SECS: u64 = 60;

/// Expectations an ID token must satisfy for one configured provider.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TokenExpectations<'a> {
	pub(crate) audience: &'a str,
	pub(crate) issuer: &'a IssuerPolicy,
	pub(crate) identity_claim: IdentityClaim,
}

/// Verifies `token` against `keys` and extracts the identity record.
pub(crate) fn verify_id_token(
	token: &TokenSecret,
	keys: &KeySet,
	expect: TokenExpectations<'_>,
) -> Result<IdentityRecord, VerificationError> {
	let raw = token.expose();
	let segments = raw.split('.').collect::<Vec<_>>();

	if segments.len() != 3 || segments[..2].iter().any(|segment| segment.is_empty()) {
		return Err(VerificationError::malformed("expected three segments with a header and payload"));
	}

	let header = jsonwebtoken::decode_header(raw)
		.map_err(|_| VerificationError::malformed("header cannot be decoded"))?;
	let kid = header.kid.filter(|kid| !kid.is_empty()).ok_or(VerificationError::MissingKeyId)?;
	let key = keys.get(&kid).ok_or_else(|| VerificationError::UnknownKey { kid: kid.clone() })?;

	// An absent signature is a signature failure, not a structural one.
	if segments[2].is_empty() || URL_SAFE_NO_PAD.decode(segments[2]).is_err() {
		return Err(VerificationError::SignatureInvalid);
	}

	let validation = validation(key.algorithm, expect);
	let data = jsonwebtoken::decode::<Claims>(raw, key.decoding_key(), &validation)
		.map_err(|e| map_jwt_error(e.into_kind()))?;

	IdentityRecord::from_claims(&data.claims, expect.identity_claim, token.clone())
}

fn validation(algorithm: jsonwebtoken::Algorithm, expect: TokenExpectations<'_>) -> Validation {
	let mut validation = Validation::new(algorithm);

	validation.leeway = LEEWAY_SECS;
	validation.set_audience(&[expect.audience]);

	match expect.issuer {
		IssuerPolicy::Enforce(issuers) => {
			validation.set_issuer(issuers);
			validation.set_required_spec_claims(&["exp", "aud", "iss"]);
		},
		IssuerPolicy::Skip => validation.set_required_spec_claims(&["exp", "aud"]),
	}

	validation
}

fn map_jwt_error(kind: JwtErrorKind) -> VerificationError {
	let mismatch = |claim: &str| VerificationError::ClaimMismatch { claim: claim.to_owned() };

	match kind {
		JwtErrorKind::InvalidSignature
		| JwtErrorKind::InvalidAlgorithm
		| JwtErrorKind::InvalidAlgorithmName
		| JwtErrorKind::InvalidKeyFormat
		| JwtErrorKind::InvalidRsaKey(_) => VerificationError::SignatureInvalid,
		JwtErrorKind::ExpiredSignature => mismatch("exp"),
		JwtErrorKind::ImmatureSignature => mismatch("nbf"),
		JwtErrorKind::InvalidIssuer => mismatch("iss"),
		JwtErrorKind::InvalidAudience => mismatch("aud"),
		JwtErrorKind::InvalidSubject => mismatch("sub"),
		JwtErrorKind::MissingRequiredClaim(claim) => mismatch(&claim),
		JwtErrorKind::Base64(_) => VerificationError::malformed("payload is not valid base64url"),
		JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) =>
			VerificationError::malformed("payload is not a JSON object"),
		JwtErrorKind::InvalidToken => VerificationError::malformed("token structure is invalid"),
		_ => VerificationError::SignatureInvalid,
	}
}
