//! Identity provider adapters.
//!
//! [`IdentityProvider`] is the object-safe contract the registry and hosts program against.
//! [`ProviderAdapter`] implements it for every [`ProviderKind`] by combining a
//! [`ProviderDescriptor`] with an HTTP transport. Adapters move from unconfigured to configured
//! exactly once; afterwards only the key set can change, via
//! [`IdentityProvider::refresh_keys`].

// crates.io
use tokio_util::sync::CancellationToken;
// self
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use crate::{
	_prelude::*,
	config::ProviderConfig,
	error::{ConfigError, TransportError},
	http::TokenHttpClient,
	identity::{IdentityRecord, ProviderName},
	oauth::{CodeExchanger, TOKEN_ENDPOINT, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	provider::{
		AuthorizationRequest, KeySet, ProviderDescriptor, ProviderKind, authorization,
		verify::{self, TokenExpectations},
	},
};

/// Default bound applied to every outbound request made by an adapter.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future returned by [`IdentityProvider`] operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Adapter specialized for the crate's default reqwest transport stack.
pub type ReqwestProviderAdapter = ProviderAdapter<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Protocol adapter for one identity provider instance.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Configured instance name, or the provider kind's label before configuration.
	fn name(&self) -> ProviderName;

	/// Returns true once [`configure`](IdentityProvider::configure) has succeeded.
	fn is_configured(&self) -> bool;

	/// Validates settings, downloads the key set, and marks the adapter configured.
	///
	/// Calling this on an already configured adapter is a no-op that returns `Ok`. When the
	/// key-set download or parse fails the adapter stays unconfigured.
	fn configure<'a>(&'a self, name: ProviderName, config: ProviderConfig) -> ProviderFuture<'a, ()>;

	/// Builds the sign-in (`signup == false`) or sign-up (`signup == true`) redirect.
	fn create_authorization_request(&self, signup: bool) -> Result<AuthorizationRequest>;

	/// Exchanges an authorization code for a verified identity.
	///
	/// Failures are final for the given code. Authorization codes are single use, so the
	/// exchange is never retried.
	fn exchange_code_for_identity<'a>(&'a self, code: &'a str) -> ProviderFuture<'a, IdentityRecord>;

	/// Downloads the key set again and swaps it in atomically.
	///
	/// Verifications already in flight finish against the set they started with. On failure
	/// the previous set stays active.
	fn refresh_keys<'a>(&'a self) -> ProviderFuture<'a, ()>;

	/// Same as [`exchange_code_for_identity`](IdentityProvider::exchange_code_for_identity),
	/// but abandons the in-flight request with [`Error::Cancelled`] once `cancel` fires.
	fn exchange_code_for_identity_with_cancel<'a>(
		&'a self,
		code: &'a str,
		cancel: &'a CancellationToken,
	) -> ProviderFuture<'a, IdentityRecord> {
		Box::pin(async move {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => Err(Error::Cancelled),
				result = self.exchange_code_for_identity(code) => result,
			}
		})
	}
}

/// [`IdentityProvider`] implementation driven by a [`ProviderDescriptor`].
pub struct ProviderAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	request_timeout: Duration,
	state: RwLock<Option<Arc<ConfiguredState<C, M>>>>,
	configure_guard: AsyncMutex<()>,
}
impl<C, M> ProviderAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an unconfigured adapter that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			descriptor,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			state: RwLock::new(None),
			configure_guard: AsyncMutex::new(()),
		}
	}

	/// Overrides the bound applied to token and key-set requests.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Descriptor driving this adapter.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Bound applied to token and key-set requests.
	pub fn request_timeout(&self) -> Duration {
		self.request_timeout
	}

	/// Returns the current key set.
	pub fn key_set(&self) -> Result<Arc<KeySet>> {
		let state = self.configured()?;
		let keys = state.keys.read().clone();

		Ok(keys)
	}

	async fn refresh(&self) -> Result<()> {
		let state = self.configured()?;
		let keys =
			KeySet::fetch(self.http_client.as_ref(), state.config.public_key_set_url(), self.request_timeout)
				.await?;

		*state.keys.write() = Arc::new(keys);

		Ok(())
	}

	async fn configure_once(&self, name: ProviderName, config: ProviderConfig) -> Result<()> {
		let kind = self.descriptor.kind;

		if !kind.is_available() {
			return Err(ConfigError::UnsupportedProvider { kind }.into());
		}

		let _guard = self.configure_guard.lock().await;

		if self.is_configured() {
			return Ok(());
		}

		let keys =
			KeySet::fetch(self.http_client.as_ref(), config.public_key_set_url(), self.request_timeout)
				.await?;
		let exchanger = CodeExchanger::new(
			&self.descriptor,
			&config,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		);
		let state = ConfiguredState { name, config, exchanger, keys: RwLock::new(Arc::new(keys)) };

		*self.state.write() = Some(Arc::new(state));

		Ok(())
	}

	async fn exchange(&self, code: &str) -> Result<IdentityRecord> {
		let state = self.configured()?;

		if code.trim().is_empty() {
			return Err(Error::TokenExchangeFailed {
				reason: "Authorization code is empty".into(),
				status: None,
			});
		}

		let token = tokio::time::timeout(self.request_timeout, state.exchanger.exchange(code))
			.await
			.map_err(|_| TransportError::Timeout {
				endpoint: TOKEN_ENDPOINT,
				timeout: self.request_timeout,
			})??;
		// Clone the set so a concurrent refresh cannot swap it mid-verification.
		let keys = state.keys.read().clone();
		let expect = TokenExpectations {
			audience: state.config.client_id(),
			issuer: &self.descriptor.issuer,
			identity_claim: self.descriptor.identity_claim,
		};

		Ok(verify::verify_id_token(&token, &keys, expect)?)
	}

	fn configured(&self) -> Result<Arc<ConfiguredState<C, M>>> {
		let state = self.state.read().clone();

		state.ok_or_else(|| Error::NotConfigured { provider: self.name().to_string() })
	}
}
#[cfg(feature = "reqwest")]
impl ProviderAdapter<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an unconfigured adapter backed by a fresh reqwest client that never follows
	/// redirects.
	pub fn new(descriptor: ProviderDescriptor) -> Result<Self> {
		Ok(Self::with_http_client(descriptor, ReqwestHttpClient::new()?, ReqwestTransportErrorMapper))
	}

	/// Creates an unconfigured adapter for the built-in descriptor of `kind`.
	pub fn for_kind(kind: ProviderKind) -> Result<Self> {
		let descriptor = kind.descriptor().map_err(ConfigError::from)?;

		Self::new(descriptor)
	}
}
impl<C, M> IdentityProvider for ProviderAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn name(&self) -> ProviderName {
		match self.state.read().as_ref() {
			Some(state) => state.name.clone(),
			None => self.descriptor.kind.default_name(),
		}
	}

	fn is_configured(&self) -> bool {
		self.state.read().is_some()
	}

	fn configure<'a>(&'a self, name: ProviderName, config: ProviderConfig) -> ProviderFuture<'a, ()> {
		let span = FlowSpan::new(FlowKind::Configure, "configure").with_provider(name.as_str());

		Box::pin(obs::observe_flow(span, self.configure_once(name, config)))
	}

	fn create_authorization_request(&self, signup: bool) -> Result<AuthorizationRequest> {
		let span = FlowSpan::new(FlowKind::Authorization, "create_authorization_request")
			.with_provider(self.name().as_str());

		obs::observe_sync(span, || {
			self.configured().map(|state| {
				authorization::build_request(&state.name, &self.descriptor, &state.config, signup)
			})
		})
	}

	fn exchange_code_for_identity<'a>(&'a self, code: &'a str) -> ProviderFuture<'a, IdentityRecord> {
		let span = FlowSpan::new(FlowKind::Exchange, "exchange_code_for_identity")
			.with_provider(self.name().as_str());

		Box::pin(obs::observe_flow(span, self.exchange(code)))
	}

	fn refresh_keys<'a>(&'a self) -> ProviderFuture<'a, ()> {
		let span =
			FlowSpan::new(FlowKind::KeyRefresh, "refresh_keys").with_provider(self.name().as_str());

		Box::pin(obs::observe_flow(span, self.refresh()))
	}
}
impl<C, M> Debug for ProviderAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderAdapter")
			.field("name", &self.name())
			.field("kind", &self.descriptor.kind)
			.field("configured", &self.is_configured())
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

struct ConfiguredState<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	name: ProviderName,
	config: ProviderConfig,
	exchanger: CodeExchanger<C, M>,
	keys: RwLock<Arc<KeySet>>,
}
