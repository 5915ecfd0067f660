//! Optional observability helpers for adapter and registry operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oidc_federation.flow` with the `flow`
//!   (operation) and `stage` (call site) fields, plus warnings for skipped configuration sections.
//! - Enable `metrics` to increment the `oidc_federation_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `oidc_federation_failure_total` counter labeled by `flow` + `reason`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Adapter configuration, including the initial key-set download.
	Configure,
	/// Authorization redirect construction.
	Authorization,
	/// Code exchange and ID token verification.
	Exchange,
	/// Explicit key-set refresh.
	KeyRefresh,
	/// Registry rebuild from a configuration tree.
	RegistryRebuild,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Configure => "configure",
			FlowKind::Authorization => "authorization",
			FlowKind::Exchange => "exchange",
			FlowKind::KeyRefresh => "key_refresh",
			FlowKind::RegistryRebuild => "registry_rebuild",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Input intentionally ignored (e.g. a declined configuration section).
	Skipped,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Skipped => "skipped",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside `span` and records its attempt and outcome.
pub(crate) async fn observe_flow<T, F>(span: FlowSpan, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let kind = span.kind();

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	finish(&span, &result);

	result
}

/// Synchronous counterpart of [`observe_flow`].
pub(crate) fn observe_sync<T>(span: FlowSpan, op: impl FnOnce() -> Result<T>) -> Result<T> {
	let kind = span.kind();

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = {
		let _guard = span.clone().entered();

		op()
	};

	finish(&span, &result);

	result
}

fn finish<T>(span: &FlowSpan, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(span.kind(), FlowOutcome::Success),
		Err(e) => {
			span.failed(e);
			record_flow_failure(span.kind(), e.kind());
		},
	}
}
