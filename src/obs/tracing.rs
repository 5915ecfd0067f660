// self
use crate::{_prelude::*, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`]; the future itself when tracing is disabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; the future itself when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `oidc_federation.flow` span with `flow`, `stage`, and `provider` fields.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind`; `stage` names the public entry point.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oidc_federation.flow",
				flow = kind.as_str(),
				stage,
				provider = tracing::field::Empty
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Tags the span with the provider instance it concerns.
	pub fn with_provider(self, provider: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			self.span.record("provider", provider);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = provider;
		}

		self
	}

	/// Operation this span belongs to.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Logs `error` under this span, labeled with its [`ErrorKind`](crate::error::ErrorKind).
	pub(crate) fn failed(&self, error: &Error) {
		#[cfg(feature = "tracing")]
		{
			tracing::warn!(
				parent: &self.span,
				reason = error.kind().as_str(),
				error = %error,
				"Identity provider operation failed."
			);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = error;
		}
	}
}

/// Logs a configuration section that was skipped instead of failing the surrounding operation.
pub fn warn_skipped_section(path: &str, reason: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(section = path, reason, "Skipping identity provider configuration section.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (path, reason);
	}
}

/// Guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}
