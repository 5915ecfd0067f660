//! Construction of configured adapters from configuration sections.

// self
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use crate::{
	_prelude::*,
	config::{ConfigSection, ProviderConfig},
	http::TokenHttpClient,
	identity::ProviderName,
	oauth::TransportErrorMapper,
	provider::{
		DEFAULT_REQUEST_TIMEOUT, IdentityProvider, ProviderAdapter, ProviderDescriptor,
		ProviderDescriptorBuilder, ProviderKind,
	},
	registry::{DisplayMetadata, ProviderEntry},
};

/// Section key that disables a provider when set to `false`.
pub const ENABLED_KEY: &str = "Enabled";
/// Section key naming the provider kind; defaults to the section key.
pub const PROVIDER_KEY: &str = "Provider";
/// Section key overriding the authorization endpoint.
pub const AUTHORIZATION_ENDPOINT_KEY: &str = "AuthorizationEndpoint";
/// Section key overriding the token endpoint.
pub const TOKEN_ENDPOINT_KEY: &str = "TokenEndpoint";
/// Section key overriding the accepted ID token issuer.
pub const ISSUER_KEY: &str = "Issuer";
/// Section key holding the label shown to end users.
pub const DISPLAY_NAME_KEY: &str = "DisplayName";
/// Section key holding the call-to-action text.
pub const MESSAGE_KEY: &str = "Message";
/// Section key holding the icon reference.
pub const ICON_KEY: &str = "Icon";

/// Boxed future returned by [`ProviderFactory::build`].
pub type FactoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Factory specialized for the crate's default reqwest transport stack.
pub type ReqwestProviderFactory =
	DefaultProviderFactory<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Result of asking a factory to build one provider section.
#[derive(Debug)]
pub enum BuildOutcome {
	/// Configured adapter plus its display metadata.
	Built(ProviderEntry),
	/// The section does not describe a usable provider and should be skipped.
	Declined {
		/// Human-readable explanation, logged by [`ProviderRegistry::rebuild`](crate::registry::ProviderRegistry::rebuild).
		reason: String,
	},
}
impl BuildOutcome {
	/// Shorthand for [`BuildOutcome::Declined`].
	pub fn declined(reason: impl Into<String>) -> Self {
		Self::Declined { reason: reason.into() }
	}
}

/// Builds configured adapters from configuration sections.
///
/// Returning [`BuildOutcome::Declined`] marks a section as optional or unusable; returning an
/// error aborts whatever bulk operation asked for the build.
pub trait ProviderFactory
where
	Self: Send + Sync,
{
	/// Builds and configures the provider described by `section`.
	fn build<'a>(&'a self, section: &'a ConfigSection) -> FactoryFuture<'a, BuildOutcome>;
}

/// Factory that turns provider sections into configured [`ProviderAdapter`]s.
///
/// All adapters it produces share one HTTP transport.
pub struct DefaultProviderFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	request_timeout: Duration,
}
impl<C, M> DefaultProviderFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a factory around a caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the request timeout applied to every adapter built by this factory.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	async fn build_section(&self, section: &ConfigSection) -> Result<BuildOutcome> {
		let plan = match plan(section) {
			Ok(plan) => plan,
			Err(reason) => return Ok(BuildOutcome::Declined { reason }),
		};
		let adapter = ProviderAdapter::<C, M>::with_http_client(
			plan.descriptor,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
		.with_request_timeout(self.request_timeout);

		adapter.configure(plan.name, plan.config).await?;

		Ok(BuildOutcome::Built(ProviderEntry::new(Arc::new(adapter), plan.metadata)))
	}
}
#[cfg(feature = "reqwest")]
impl DefaultProviderFactory<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a factory backed by a fresh reqwest client that never follows redirects.
	pub fn new() -> Result<Self> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?, ReqwestTransportErrorMapper))
	}
}
impl<C, M> ProviderFactory for DefaultProviderFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn build<'a>(&'a self, section: &'a ConfigSection) -> FactoryFuture<'a, BuildOutcome> {
		Box::pin(self.build_section(section))
	}
}
impl<C, M> Debug for DefaultProviderFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DefaultProviderFactory")
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

struct BuildPlan {
	name: ProviderName,
	config: ProviderConfig,
	descriptor: ProviderDescriptor,
	metadata: DisplayMetadata,
}

// Every failure here is a decline reason rather than an error.
fn plan(section: &ConfigSection) -> Result<BuildPlan, String> {
	if !section.is_object() {
		return Err("section is not an object".into());
	}
	if section.get_bool(ENABLED_KEY) == Some(false) {
		return Err("provider is disabled".into());
	}

	let kind = section
		.get(PROVIDER_KEY)
		.unwrap_or_else(|| section.key())
		.parse::<ProviderKind>()
		.map_err(|e| e.to_string())?;

	if !kind.is_available() {
		return Err(format!("provider kind `{kind}` is not available"));
	}

	let name = ProviderName::new(section.key()).map_err(|e| e.to_string())?;
	let config = ProviderConfig::from_section(section).map_err(|e| e.to_string())?;
	let descriptor = descriptor(kind, section)?;
	let display_name = section.get(DISPLAY_NAME_KEY).unwrap_or(name.as_str());
	let mut metadata = DisplayMetadata::new(display_name);

	if let Some(message) = section.get(MESSAGE_KEY) {
		metadata = metadata.with_message(message);
	}
	if let Some(icon) = section.get(ICON_KEY) {
		metadata = metadata.with_icon_ref(icon);
	}

	Ok(BuildPlan { name, config, descriptor, metadata })
}

fn descriptor(kind: ProviderKind, section: &ConfigSection) -> Result<ProviderDescriptor, String> {
	let mut builder = ProviderDescriptorBuilder::new(kind);

	if let Some(raw) = section.get(AUTHORIZATION_ENDPOINT_KEY) {
		builder = builder.authorization_endpoint(parse_override(AUTHORIZATION_ENDPOINT_KEY, raw)?);
	}
	if let Some(raw) = section.get(TOKEN_ENDPOINT_KEY) {
		builder = builder.token_endpoint(parse_override(TOKEN_ENDPOINT_KEY, raw)?);
	}
	if let Some(issuer) = section.get(ISSUER_KEY) {
		builder = builder.issuer(issuer);
	}

	builder.build().map_err(|e| e.to_string())
}

fn parse_override(key: &str, raw: &str) -> Result<Url, String> {
	Url::parse(raw).map_err(|e| format!("`{key}` is not a valid URL: {e}"))
}
