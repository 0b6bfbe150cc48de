//! Optional observability helpers for identity and request operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `session_broker.op` with the `op`
//!   and `stage` fields, plus `warn` events whenever a failure is deliberately swallowed.
//! - Enable `metrics` to increment the `session_broker_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and the
//!   `session_broker_http_response_total` counter for every received response, labeled by `op` +
//!   status `class` (`2xx`, `401`, `4xx`, `5xx`, ...).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the request layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// `POST /auth/login`.
	Login,
	/// `POST /auth/refresh`, single-flighted.
	Refresh,
	/// `POST /auth/logout`.
	Logout,
	/// `GET /auth/me`.
	Identity,
	/// Application call issued through the executor.
	Request,
	/// Session state machine transition.
	Session,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Login => "login",
			OpKind::Refresh => "refresh",
			OpKind::Logout => "logout",
			OpKind::Identity => "identity",
			OpKind::Request => "request",
			OpKind::Session => "session",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an [`OpSpan`] and records attempt + success/failure outcomes.
pub(crate) async fn observe<T, E, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T, E>
where
	Fut: Future<Output = Result<T, E>>,
{
	let span = OpSpan::new(kind, stage);

	record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
