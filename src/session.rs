//! Process-wide session state machine.
//!
//! ```text
//! Bootstrapping ──► Unauthenticated ◄──┐
//!       │               │  ▲            │
//!       ▼               ▼  │            │
//! Authenticated ──► LoggingIn / LoggingOut
//! ```
//!
//! [`SessionController`] owns the loaded [`Identity`] and the current [`SessionPhase`]. Whether the
//! session is authenticated is never stored: it is recomputed from the identity and the live
//! expiry of the [`CredentialStore`] on every read.

// self
use crate::{
	_prelude::*,
	auth::{AuthClient, Identity},
	credential::CredentialStore,
	http::HttpTransport,
	obs::{self, OpKind},
	refresh::RefreshCoordinator,
};

/// Loading phase of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
	/// Process start; the cookie-based refresh has not settled yet.
	Bootstrapping,
	/// No usable session.
	Unauthenticated,
	/// Credential and identity are loaded.
	Authenticated,
	/// A login call is in flight.
	LoggingIn,
	/// A logout call is in flight.
	LoggingOut,
}
impl SessionPhase {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionPhase::Bootstrapping => "bootstrapping",
			SessionPhase::Unauthenticated => "unauthenticated",
			SessionPhase::Authenticated => "authenticated",
			SessionPhase::LoggingIn => "logging_in",
			SessionPhase::LoggingOut => "logging_out",
		}
	}

	/// Returns `true` for the two resting phases.
	pub const fn is_settled(self) -> bool {
		matches!(self, SessionPhase::Unauthenticated | SessionPhase::Authenticated)
	}
}
impl Display for SessionPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Point-in-time view of the session for the UI layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionState {
	/// Loaded principal, if any.
	pub identity: Option<Identity>,
	/// Current loading phase.
	pub phase: SessionPhase,
	/// Identity present and credential unexpired, evaluated when this snapshot was taken.
	pub is_authenticated: bool,
}

#[derive(Debug)]
struct Inner {
	phase: SessionPhase,
	identity: Option<Identity>,
}

/// Drives bootstrap, login, logout, and identity refresh.
pub struct SessionController<C>
where
	C: ?Sized + HttpTransport,
{
	auth: AuthClient<C>,
	coordinator: Arc<RefreshCoordinator<C>>,
	store: Arc<CredentialStore>,
	inner: Mutex<Inner>,
}
impl<C> SessionController<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a controller in [`SessionPhase::Bootstrapping`].
	///
	/// `coordinator` must be the same instance the request executor uses so a bootstrap refresh
	/// coalesces with refreshes triggered by early application calls.
	pub fn new(auth: AuthClient<C>, coordinator: Arc<RefreshCoordinator<C>>) -> Self {
		let store = auth.store().clone();

		Self {
			auth,
			coordinator,
			store,
			inner: Mutex::new(Inner { phase: SessionPhase::Bootstrapping, identity: None }),
		}
	}

	/// Current loading phase.
	pub fn phase(&self) -> SessionPhase {
		self.inner.lock().phase
	}

	/// Loaded principal, if any.
	pub fn identity(&self) -> Option<Identity> {
		self.inner.lock().identity.clone()
	}

	/// `true` iff an identity is loaded and the stored credential has not expired right now.
	pub fn is_authenticated(&self) -> bool {
		self.inner.lock().identity.is_some() && !self.store.is_expired()
	}

	/// Snapshot of identity, phase, and the derived authentication flag.
	pub fn state(&self) -> SessionState {
		let inner = self.inner.lock();

		SessionState {
			identity: inner.identity.clone(),
			phase: inner.phase,
			is_authenticated: inner.identity.is_some() && !self.store.is_expired(),
		}
	}

	/// Restores a session from the HTTP-level credential at process start.
	///
	/// A failed refresh is expected for first-time visitors and only logged.
	pub async fn bootstrap(&self) -> SessionPhase {
		self.transition(SessionPhase::Bootstrapping);

		if let Err(err) = self.coordinator.ensure_refreshed_once().await {
			obs::log_suppressed(OpKind::Session, "bootstrap_refresh", err.as_ref());
		}
		if self.store.get().is_none() {
			return self.settle_unauthenticated();
		}

		match self.auth.fetch_current_identity().await {
			Ok(identity) => self.settle_authenticated(identity),
			Err(err) => {
				obs::log_suppressed(OpKind::Session, "bootstrap_identity", &err);
				self.store.clear();

				self.settle_unauthenticated()
			},
		}
	}

	/// Signs in and loads the identity behind the new credential.
	///
	/// On failure the session returns to [`SessionPhase::Unauthenticated`] and the error is
	/// handed back unchanged. A login that succeeds but whose identity cannot be loaded leaves no
	/// usable session, so the credential it wrote is cleared.
	pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
		self.transition(SessionPhase::LoggingIn);

		if let Err(err) = self.auth.login(email, password).await {
			self.settle_unauthenticated();

			return Err(err);
		}

		match self.auth.fetch_current_identity().await {
			Ok(identity) => {
				self.settle_authenticated(identity.clone());

				Ok(identity)
			},
			Err(err) => {
				self.store.clear();
				self.settle_unauthenticated();

				Err(err)
			},
		}
	}

	/// Ends the session. Local state is cleared even when the remote call fails.
	pub async fn logout(&self) {
		self.transition(SessionPhase::LoggingOut);

		if let Err(err) = self.auth.logout().await {
			obs::log_suppressed(OpKind::Logout, "remote_logout", &err);
		}

		self.store.clear();
		self.settle_unauthenticated();
	}

	/// Re-fetches the identity. Any failure is treated as the end of the session.
	pub async fn refresh_identity(&self) -> Result<Identity> {
		match self.auth.fetch_current_identity().await {
			Ok(identity) => {
				self.settle_authenticated(identity.clone());

				Ok(identity)
			},
			Err(err) => {
				self.store.clear();
				self.settle_unauthenticated();

				Err(err)
			},
		}
	}

	/// Applies the session consequence of an error returned by the request executor.
	///
	/// Returns `true` when the error ended the session ([`Error::AuthExpired`]); the caller should
	/// then route the user to its sign-in view. Every other error leaves the session untouched.
	pub fn absorb(&self, err: &Error) -> bool {
		if !err.is_auth_expired() {
			return false;
		}

		self.store.clear();
		self.settle_unauthenticated();

		true
	}

	fn settle_authenticated(&self, identity: Identity) -> SessionPhase {
		let mut inner = self.inner.lock();

		inner.identity = Some(identity);

		Self::set_phase(&mut inner, SessionPhase::Authenticated)
	}

	fn settle_unauthenticated(&self) -> SessionPhase {
		let mut inner = self.inner.lock();

		inner.identity = None;

		Self::set_phase(&mut inner, SessionPhase::Unauthenticated)
	}

	fn transition(&self, to: SessionPhase) {
		Self::set_phase(&mut self.inner.lock(), to);
	}

	fn set_phase(inner: &mut Inner, to: SessionPhase) -> SessionPhase {
		if inner.phase != to {
			obs::log_transition(inner.phase.as_str(), to.as_str());

			inner.phase = to;
		}

		to
	}
}
impl<C> Debug for SessionController<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionController").field("state", &self.state()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn phase_labels_and_settled_flags() {
		assert_eq!(SessionPhase::LoggingOut.to_string(), "logging_out");
		assert!(SessionPhase::Authenticated.is_settled());
		assert!(SessionPhase::Unauthenticated.is_settled());
		assert!(!SessionPhase::Bootstrapping.is_settled());
		assert!(!SessionPhase::LoggingIn.is_settled());
		assert_eq!(
			serde_json::to_string(&SessionPhase::LoggingIn).expect("Phase should serialize."),
			"\"logging_in\""
		);
	}
}
