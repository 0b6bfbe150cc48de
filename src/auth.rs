//! Identity service client.
//!
//! [`AuthClient`] performs login, refresh, logout, and current-identity calls, validates every
//! response body, and is the only writer of fresh credentials into the [`CredentialStore`].
//! Bearer tokens are attached whenever one is usable; the transport's cookie jar carries the
//! HTTP-level session credential on every call.

pub mod model;

pub use model::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	credential::CredentialStore,
	http::{self, HttpRequest, HttpTransport, Method},
	obs::{self, OpKind},
};

/// Client for the four identity operations.
pub struct AuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	config: Arc<ClientConfig>,
	store: Arc<CredentialStore>,
}
impl<C> AuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that writes credentials into `store`.
	pub fn new(
		transport: impl Into<Arc<C>>,
		config: Arc<ClientConfig>,
		store: Arc<CredentialStore>,
	) -> Self {
		Self { transport: transport.into(), config, store }
	}

	/// Credential store this client writes into.
	pub fn store(&self) -> &Arc<CredentialStore> {
		&self.store
	}

	/// Exchanges email + password for a grant.
	///
	/// A token in the response is written into the store; its absence is not an error because
	/// cookie-only deployments never return one.
	pub async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
		obs::observe(OpKind::Login, "login", async move {
			let body = http::encode_json(&model::LoginForm { email, password })?;
			let request = HttpRequest::new(Method::Post, self.config.login_url()?)
				.with_body(Some(body));
			let grant = self.call::<AuthGrant>(OpKind::Login, request).await?;

			grant.validate()?;
			self.store_grant(&grant);

			Ok(grant)
		})
		.await
	}

	/// Renews the credential using the HTTP-level session credential.
	///
	/// Any failure clears the store, since the server-side session can no longer mint tokens.
	/// Concurrent callers should go through [`RefreshCoordinator`](crate::refresh::RefreshCoordinator)
	/// instead of calling this directly.
	pub async fn refresh(&self) -> Result<AuthGrant> {
		let result = obs::observe(OpKind::Refresh, "refresh", async {
			let request = HttpRequest::new(Method::Post, self.config.refresh_url()?)
				.with_bearer(self.store.get());
			let grant = self.call::<AuthGrant>(OpKind::Refresh, request).await?;

			grant.validate()?;
			self.store_grant(&grant);

			Ok(grant)
		})
		.await;

		if result.is_err() {
			self.store.clear();
		}

		result
	}

	/// Ends the server-side session. The store is cleared whether or not the remote call
	/// succeeds.
	pub async fn logout(&self) -> Result<LogoutAck> {
		let result = obs::observe(OpKind::Logout, "logout", async {
			let request = HttpRequest::new(Method::Post, self.config.logout_url()?)
				.with_bearer(self.store.get());

			self.call::<LogoutAck>(OpKind::Logout, request).await
		})
		.await;

		self.store.clear();

		result
	}

	/// Fetches the principal behind the current credential. Read-only.
	pub async fn fetch_current_identity(&self) -> Result<Identity> {
		obs::observe(OpKind::Identity, "fetch_current_identity", async {
			let request = HttpRequest::new(Method::Get, self.config.me_url()?)
				.with_bearer(self.store.get());

			self.call::<Identity>(OpKind::Identity, request).await
		})
		.await
	}

	async fn call<T>(&self, kind: OpKind, request: HttpRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = request.url.clone();
		let response = self.transport.send(request).await?;

		obs::record_response(kind, response.status);

		let response = http::ensure_success(response)?;

		Ok(http::decode_json(&url, &response.body)?)
	}

	fn store_grant(&self, grant: &AuthGrant) {
		if let Some(token) = grant.access_token.clone() {
			self.store.set(token, grant.lifetime());
		}
	}
}
impl<C> Clone for AuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			store: self.store.clone(),
		}
	}
}
impl<C> Debug for AuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.finish()
	}
}
