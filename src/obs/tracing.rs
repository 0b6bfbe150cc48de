// self
use crate::{_prelude::*, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by identity and request operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_broker.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
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
}

/// Logs a failure that the caller deliberately does not propagate.
pub fn log_suppressed(kind: OpKind, stage: &'static str, err: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = kind.as_str(), stage, error = %err, "suppressed failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage, err);
	}
}

/// Logs a session phase change.
pub fn log_transition(from: &'static str, to: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = OpKind::Session.as_str(), from, to, "session transition");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to);
	}
}
