//! HTTP transport seam shared by token exchanges and key-set downloads.
//!
//! Adapters never own an HTTP stack. They ask a [`TokenHttpClient`] for a short-lived
//! [`AsyncHttpClient`] handle bound to a [`StatusSlot`], so the status of a failed token
//! response survives the trip through `oauth2`, whose errors do not carry it.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
#[cfg(feature = "reqwest")] use crate::error::ConfigError;
use crate::_prelude::*;

/// Transport shared by every adapter built from the same factory.
///
/// Handles must be `Send + Sync` and their request futures `Send`, so exchanges can hop
/// executors. Implementations must not follow redirects: token requests carry the client
/// secret and key sets must come from the configured URL.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Request handle passed to `oauth2` and to the key-set download.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle that clears `status` before each request and records the HTTP status
	/// as soon as a response arrives.
	fn handle(&self, status: StatusSlot) -> Self::Handle;
}

/// HTTP status of the last response seen by one handle.
#[derive(Clone, Debug, Default)]
pub struct StatusSlot(Arc<Mutex<Option<u16>>>);
impl StatusSlot {
	/// Records the status of a response.
	pub fn record(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	/// Forgets any previously recorded status.
	pub fn clear(&self) {
		*self.0.lock() = None;
	}

	/// Status of the last response, if one arrived.
	pub fn get(&self) -> Option<u16> {
		*self.0.lock()
	}
}

/// reqwest-backed [`TokenHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps a caller-built client.
	///
	/// The client should be built with [`Policy::none`]; otherwise a redirecting token endpoint
	/// receives the client secret a second time.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self, status: StatusSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), status }
	}
}

/// Request handle produced by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	status: StatusSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.status.clone();

		Box::pin(async move {
			slot.clear();

			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			slot.record(status.as_u16());

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}
