//! Redacted holder for client secrets and raw ID tokens.

// self
use crate::_prelude::*;

/// Secret string that stays out of logs and serialized output.
///
/// The value is shared, so copying a verified ID token into an
/// [`IdentityRecord`](crate::identity::IdentityRecord) does not duplicate it. There is no
/// `Serialize` impl; the only way out is [`expose`](Self::expose).
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(Arc<str>);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<Arc<str>>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Byte length of the secret, which is safe to log.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when the secret is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<{} bytes redacted>)", self.len())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_hide_the_value() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<12 bytes redacted>)");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn clones_share_the_value() {
		let token = TokenSecret::new(String::from("h.p.s"));
		let copy = token.clone();

		assert_eq!(copy, token);
		assert!(std::ptr::eq(copy.expose(), token.expose()));
		assert!(!copy.is_empty());
	}
}
