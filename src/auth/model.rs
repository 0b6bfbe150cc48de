//! Wire shapes exchanged with the identity service.

// self
use crate::{_prelude::*, credential::TokenSecret, error::ValidationError};

/// Authenticated principal as returned by the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Stable user identifier.
	pub id: String,
	/// Sign-in email address.
	pub email: String,
	/// Account creation timestamp, kept verbatim.
	pub created_at: String,
}

/// Body returned by `POST /auth/login` and `POST /auth/refresh`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthGrant {
	/// Principal the grant was issued to.
	pub user: Identity,
	/// Bearer token; absent in cookie-only deployments.
	#[serde(default)]
	pub access_token: Option<TokenSecret>,
	/// Refresh token echoed by some deployments; the cookie jar remains the source of truth.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Token type, normally `bearer`.
	pub token_type: String,
	/// Access token lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
}
impl AuthGrant {
	/// Checks the invariants serde cannot express.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.access_token.as_ref().is_some_and(TokenSecret::is_empty) {
			return Err(ValidationError::EmptyAccessToken);
		}
		if let Some(expires_in) = self.expires_in {
			if expires_in <= 0 {
				return Err(ValidationError::NonPositiveExpiresIn { expires_in });
			}
			if OffsetDateTime::now_utc().checked_add(Duration::seconds(expires_in)).is_none() {
				return Err(ValidationError::ExpiresInOutOfRange { expires_in });
			}
		}

		Ok(())
	}

	/// Lifetime as a [`Duration`], if the server supplied one.
	pub fn lifetime(&self) -> Option<Duration> {
		self.expires_in.map(Duration::seconds)
	}
}
impl Debug for AuthGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthGrant")
			.field("user", &self.user)
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Body returned by `POST /auth/logout`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutAck {
	/// Human-readable server message.
	pub message: String,
	/// Whether the server ended the session.
	pub success: bool,
}

/// Body sent to `POST /auth/login`.
#[derive(Serialize)]
pub(crate) struct LoginForm<'a> {
	pub(crate) email: &'a str,
	pub(crate) password: &'a str,
}
