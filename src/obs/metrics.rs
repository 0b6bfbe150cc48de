// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome on `session_broker_op_total` (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_broker_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one received response on `session_broker_http_response_total`, labeled by `op` +
/// status `class`.
pub fn record_response(kind: OpKind, status: u16) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_broker_http_response_total",
			"op" => kind.as_str(),
			"class" => status_class(status)
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, status);
	}
}

/// Status class label; `401` has its own bucket.
pub const fn status_class(status: u16) -> &'static str {
	match status {
		200..=299 => "2xx",
		300..=399 => "3xx",
		401 => "401",
		400..=499 => "4xx",
		500..=599 => "5xx",
		_ => "other",
	}
}
