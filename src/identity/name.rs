//! Validated provider names used as registry keys and `state` prefixes.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const NAME_MAX_LEN: usize = 128;

/// Separator between the provider name and the random part of an authorization `state`.
pub const STATE_SEPARATOR: char = ':';

/// Error returned when provider name validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum NameError {
	/// The name was empty.
	#[error("Provider name cannot be empty.")]
	Empty,
	/// The name contains whitespace characters.
	#[error("Provider name contains whitespace.")]
	ContainsWhitespace,
	/// The name contains the `state` separator.
	#[error("Provider name cannot contain `:`.")]
	ContainsSeparator,
	/// The name exceeded the allowed character count.
	#[error("Provider name exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Case-sensitive provider name (e.g. `Google`, `Contoso-Microsoft`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);
impl ProviderName {
	/// Creates a new provider name after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, NameError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	// Callers pass compile-time labels that already satisfy the rules.
	pub(crate) fn from_static(value: &'static str) -> Self {
		debug_assert!(validate_view(value).is_ok(), "Static provider name must be valid.");

		Self(value.to_owned())
	}

	/// Returns the name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for ProviderName {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ProviderName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for ProviderName {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<ProviderName> for String {
	fn from(value: ProviderName) -> Self {
		value.0
	}
}
impl TryFrom<String> for ProviderName {
	type Error = NameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for ProviderName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Provider({})", self.0)
	}
}
impl Display for ProviderName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ProviderName {
	type Err = NameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), NameError> {
	if view.is_empty() {
		return Err(NameError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(NameError::ContainsWhitespace);
	}
	if view.contains(STATE_SEPARATOR) {
		return Err(NameError::ContainsSeparator);
	}
	if view.len() > NAME_MAX_LEN {
		return Err(NameError::TooLong { max: NAME_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn names_reject_whitespace_and_separator() {
		assert!(ProviderName::new(" Google").is_err(), "Leading whitespace must be rejected.");
		assert_eq!(ProviderName::new(""), Err(NameError::Empty));
		assert_eq!(ProviderName::new("Google:work"), Err(NameError::ContainsSeparator));

		let name = ProviderName::new("Google").expect("Provider fixture should be valid.");

		assert_eq!(name.as_str(), "Google");
		assert_ne!(name, ProviderName::new("google").expect("Lowercase name should be valid."));
	}

	#[test]
	fn length_limit_is_inclusive() {
		ProviderName::new("a".repeat(NAME_MAX_LEN)).expect("Exact length should succeed.");

		assert!(ProviderName::new("a".repeat(NAME_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let name: ProviderName =
			serde_json::from_str("\"Microsoft\"").expect("Name should deserialize successfully.");

		assert_eq!(name.as_str(), "Microsoft");
		assert!(serde_json::from_str::<ProviderName>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ProviderName, u8> = HashMap::from_iter([(
			ProviderName::new("Google").expect("Provider used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("Google"), Some(&7));
	}
}
