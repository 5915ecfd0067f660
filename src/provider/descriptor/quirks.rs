// self
use crate::{_prelude::*, provider::ProviderKind};

/// Extra authorization request parameter appended after `response_type`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeParam {
	/// Fixed name/value pair.
	Static {
		/// Query parameter name.
		name: String,
		/// Query parameter value.
		value: String,
	},
	/// A fresh random `nonce` generated per request.
	Nonce,
}
impl AuthorizeParam {
	/// Creates a fixed parameter.
	pub fn fixed(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Static { name: name.into(), value: value.into() }
	}
}

/// Provider-specific quirks that influence how authorization requests are built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Parameters appended, in order, between `response_type` and `state`.
	pub authorize_params: Vec<AuthorizeParam>,
}
impl ProviderQuirks {
	/// Returns the built-in quirks for `kind`.
	pub fn for_kind(kind: ProviderKind) -> Self {
		let authorize_params = match kind {
			ProviderKind::Google => vec![
				AuthorizeParam::fixed("access_type", "offline"),
				AuthorizeParam::fixed("include_granted_scopes", "true"),
				AuthorizeParam::fixed("prompt", "consent"),
			],
			ProviderKind::Microsoft => vec![
				AuthorizeParam::fixed("access_type", "offline"),
				AuthorizeParam::fixed("response_mode", "query"),
				AuthorizeParam::Nonce,
				AuthorizeParam::fixed("prompt", "consent"),
			],
			ProviderKind::Apple => vec![
				AuthorizeParam::fixed("response_mode", "query"),
				AuthorizeParam::fixed("access_type", "offline"),
			],
		};

		Self { authorize_params }
	}

	/// Returns true when authorization requests carry a `nonce`.
	pub fn requires_nonce(&self) -> bool {
		self.authorize_params.iter().any(|param| matches!(param, AuthorizeParam::Nonce))
	}
}
