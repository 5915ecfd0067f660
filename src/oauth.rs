//! Token-endpoint facade built on the `oauth2` crate.
//!
//! Only the authorization-code exchange is modelled. OpenID providers are free to omit the
//! OAuth fields they consider irrelevant, so [`IdTokenResponse`] only insists on `id_token`.

pub use oauth2;

// crates.io
use oauth2::{
	AccessToken, AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	TokenResponse, TokenType, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse,
	},
};
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	config::ProviderConfig,
	error::{ConfigError, TransportError},
	http::{StatusSlot, TokenHttpClient},
	identity::TokenSecret,
	provider::ProviderDescriptor,
};

/// Endpoint label used in transport errors raised by the token exchange.
pub const TOKEN_ENDPOINT: &str = "token";

type IdTokenClient = oauth2::Client<
	BasicErrorResponse,
	IdTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Token endpoint success body as far as sign-in is concerned.
///
/// `access_token` and `token_type` are accepted but may be absent or `null`; every other
/// OAuth field is ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdTokenResponse {
	#[serde(default = "absent_access_token", deserialize_with = "nullable_access_token")]
	access_token: AccessToken,
	#[serde(default)]
	token_type: ReportedTokenType,
	/// Compact-serialized ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl TokenResponse for IdTokenResponse {
	type TokenType = ReportedTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<Duration> {
		None
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		None
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

/// `token_type` exactly as the provider reported it, if at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportedTokenType(pub Option<String>);
impl TokenType for ReportedTokenType {}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	///
	/// `status` is the HTTP status of the failed response when one arrived before the failure.
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		status: Option<u16>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		status: Option<u16>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => Error::TokenExchangeFailed {
				reason: format!("HTTP client failed while calling the {endpoint} endpoint: {message}"),
				status,
			},
			_ => Error::TokenExchangeFailed {
				reason: format!("HTTP client failed while calling the {endpoint} endpoint"),
				status,
			},
		}
	}
}

/// Authorization-code exchanger bound to one provider configuration.
pub(crate) struct CodeExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: IdTokenClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> CodeExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds an exchanger that authenticates with form-body client credentials.
	pub(crate) fn new(
		descriptor: &ProviderDescriptor,
		config: &ProviderConfig,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		let oauth_client = oauth2::Client::<
			BasicErrorResponse,
			IdTokenResponse,
			BasicTokenIntrospectionResponse,
			StandardRevocableToken,
			BasicRevocationErrorResponse,
		>::new(ClientId::new(config.client_id().to_owned()))
		.set_client_secret(ClientSecret::new(config.client_secret().expose().to_owned()))
		.set_token_uri(TokenUrl::from_url(descriptor.endpoints.token.clone()))
		.set_redirect_uri(RedirectUrl::from_url(config.redirect_url().clone()))
		.set_auth_type(AuthType::RequestBody);

		Self { oauth_client, http_client, error_mapper }
	}

	/// Exchanges `code` and returns the raw `id_token` from the token response.
	pub(crate) fn exchange<'a>(&'a self, code: &'a str) -> FacadeFuture<'a, TokenSecret> {
		let status = StatusSlot::default();

		Box::pin(async move {
			let handle = self.http_client.handle(status.clone());
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.request_async(&handle)
				.await
				.map_err(|err| map_request_error(status.get(), err, self.error_mapper.as_ref()))?;

			response
				.id_token
				.as_deref()
				.map(str::trim)
				.filter(|token| !token.is_empty())
				.map(TokenSecret::new)
				.ok_or_else(|| Error::TokenExchangeFailed {
					reason: "Token response does not contain an id_token".into(),
					status: status.get(),
				})
		})
	}
}

fn absent_access_token() -> AccessToken {
	AccessToken::new(String::new())
}

fn nullable_access_token<'de, D>(deserializer: D) -> Result<AccessToken, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;

	Ok(AccessToken::new(raw.unwrap_or_default()))
}

fn map_request_error<E, M>(
	status: Option<u16>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			Error::TokenExchangeFailed { reason, status }
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(TOKEN_ENDPOINT, status, error),
		RequestTokenError::Parse(error, _body) => Error::TokenExchangeFailed {
			reason: format!("Token response could not be parsed at `{}`", error.path()),
			status,
		},
		RequestTokenError::Other(message) => Error::TokenExchangeFailed {
			reason: format!("Token endpoint returned an unexpected response: {message}"),
			status,
		},
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: &'static str, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::network(endpoint, err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
	use crate::provider::ProviderKind;

	#[test]
	fn only_id_token_is_required() {
		let full: IdTokenResponse = serde_json::from_str(
			r#"{"access_token":"at","token_type":"Bearer","expires_in":3599,"scope":"openid","id_token":"a.b.c"}"#,
		)
		.expect("Full token response should parse.");
		let bare: IdTokenResponse = serde_json::from_str(r#"{"id_token":"a.b.c"}"#)
			.expect("Token response with only id_token should parse.");
		let nulls: IdTokenResponse =
			serde_json::from_str(r#"{"access_token":null,"token_type":null,"id_token":"a.b.c"}"#)
				.expect("Null OAuth fields should parse.");
		let without: IdTokenResponse = serde_json::from_str(r#"{"access_token":"at"}"#)
			.expect("Token response without id_token should still parse.");

		assert_eq!(full.id_token.as_deref(), Some("a.b.c"));
		assert_eq!(full.access_token().secret(), "at");
		assert_eq!(full.token_type(), &ReportedTokenType(Some("Bearer".into())));
		assert_eq!(bare.id_token.as_deref(), Some("a.b.c"));
		assert!(bare.access_token().secret().is_empty());
		assert_eq!(bare.token_type(), &ReportedTokenType(None));
		assert_eq!(nulls.id_token.as_deref(), Some("a.b.c"));
		assert!(without.id_token.is_none());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn builds_request_body_client() {
		let descriptor =
			ProviderKind::Google.descriptor().expect("Google descriptor should build.");
		let config = ProviderConfig::builder()
			.client_id("c1")
			.client_secret("s1")
			.redirect_url("https://app/cb")
			.sign_in_scope("openid")
			.sign_up_scope("openid")
			.public_key_set_url("https://www.googleapis.com/oauth2/v3/certs")
			.build()
			.expect("Config fixture should build.");
		let exchanger = <CodeExchanger<ReqwestHttpClient, ReqwestTransportErrorMapper>>::new(
			&descriptor,
			&config,
			Arc::new(ReqwestHttpClient::new().expect("Reqwest client should build.")),
			Arc::new(ReqwestTransportErrorMapper),
		);

		assert_eq!(exchanger.oauth_client.client_id().as_str(), "c1");
		assert_eq!(
			exchanger.oauth_client.token_uri().as_str(),
			"https://oauth2.googleapis.com/token"
		);
	}
}
