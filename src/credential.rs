//! In-memory owner of the current access credential.
//!
//! [`CredentialStore`] is the only place the access token and its expiry live. Both halves are
//! written and cleared together, and every accessor re-validates against the clock, so an expired
//! credential reads exactly like a missing one without any background timer.

pub mod secret;

pub use secret::TokenSecret;

// crates.io
use time::PrimitiveDateTime;
// self
use crate::_prelude::*;

/// Validity window applied when the server omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::minutes(30);

/// Access token paired with the instant it stops being usable.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	/// Bearer secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Returns `true` if the credential is unusable at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Time left before expiry at `instant`, clamped to zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Single-slot credential holder shared by the request and session layers.
///
/// Writes are last-write-wins and never await, so a `set` or `clear` is atomic with respect to
/// every other task. Reads lazily clear a credential found expired.
#[derive(Debug)]
pub struct CredentialStore {
	slot: Mutex<Option<Credential>>,
	default_lifetime: Duration,
}
impl CredentialStore {
	/// Creates an empty store using [`DEFAULT_TOKEN_LIFETIME`].
	pub fn new() -> Self {
		Self::with_default_lifetime(DEFAULT_TOKEN_LIFETIME)
	}

	/// Creates an empty store with a custom fallback lifetime.
	pub fn with_default_lifetime(default_lifetime: Duration) -> Self {
		Self { slot: Mutex::new(None), default_lifetime }
	}

	/// Fallback lifetime applied by [`CredentialStore::set`] when `expires_in` is absent.
	pub fn default_lifetime(&self) -> Duration {
		self.default_lifetime
	}

	/// Stores `access_token`, replacing any previous credential.
	pub fn set(&self, access_token: impl Into<TokenSecret>, expires_in: Option<Duration>) {
		self.set_at(access_token, expires_in, OffsetDateTime::now_utc());
	}

	/// Same as [`CredentialStore::set`] with an explicit "now".
	pub fn set_at(
		&self,
		access_token: impl Into<TokenSecret>,
		expires_in: Option<Duration>,
		now: OffsetDateTime,
	) {
		let lifetime = expires_in.unwrap_or(self.default_lifetime);
		// Saturate at the last representable instant.
		let expires_at =
			now.checked_add(lifetime).unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
		let credential = Credential { access_token: access_token.into(), expires_at };

		*self.slot.lock() = Some(credential);
	}

	/// Returns the token if it is still usable.
	pub fn get(&self) -> Option<TokenSecret> {
		self.get_at(OffsetDateTime::now_utc())
	}

	/// Same as [`CredentialStore::get`] with an explicit "now".
	pub fn get_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.snapshot_at(now).map(|credential| credential.access_token)
	}

	/// Returns a copy of the usable credential, including its expiry.
	pub fn snapshot(&self) -> Option<Credential> {
		self.snapshot_at(OffsetDateTime::now_utc())
	}

	/// Same as [`CredentialStore::snapshot`] with an explicit "now".
	pub fn snapshot_at(&self, now: OffsetDateTime) -> Option<Credential> {
		let mut slot = self.slot.lock();

		if slot.as_ref().is_some_and(|credential| credential.is_expired_at(now)) {
			*slot = None;
		}

		slot.clone()
	}

	/// Returns `true` if no credential is stored or the stored one has expired.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Same as [`CredentialStore::is_expired`] with an explicit "now".
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.slot.lock().as_ref().is_none_or(|credential| credential.is_expired_at(now))
	}

	/// Removes the credential. Idempotent.
	pub fn clear(&self) {
		self.slot.lock().take();
	}
}
impl Default for CredentialStore {
	fn default() -> Self {
		Self::new()
	}
}
