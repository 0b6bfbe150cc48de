//! Application request execution with proactive refresh and a single reactive retry.
//!
//! [`RequestExecutor`] attaches the current bearer token to every call. Before issuing a call it
//! refreshes proactively (best-effort) when the stored credential is already expired. When a call
//! comes back `401`, it joins one single-flight refresh and reissues the same call exactly once; a
//! failed refresh clears the credential and surfaces [`Error::AuthExpired`]. Calls that target the
//! refresh endpoint itself never trigger either path.

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	credential::CredentialStore,
	http::{self, HttpRequest, HttpResponse, HttpTransport, Method},
	obs::{self, OpKind},
	refresh::RefreshCoordinator,
};

/// Description of one application call.
#[derive(Clone, Debug)]
pub struct RequestSpec {
	/// HTTP method.
	pub method: Method,
	/// Path (and optional query) relative to the configured base URL.
	pub path: String,
	/// JSON-encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl RequestSpec {
	/// Creates a spec without a body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `PATCH path`.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(http::encode_json(body)?);

		Ok(self)
	}
}

/// Issues application calls on behalf of the current session.
pub struct RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	config: Arc<ClientConfig>,
	store: Arc<CredentialStore>,
	coordinator: Arc<RefreshCoordinator<C>>,
}
impl<C> RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an executor sharing `store` and `coordinator` with the session layer.
	pub fn new(
		transport: impl Into<Arc<C>>,
		config: Arc<ClientConfig>,
		store: Arc<CredentialStore>,
		coordinator: Arc<RefreshCoordinator<C>>,
	) -> Self {
		Self { transport: transport.into(), config, store, coordinator }
	}

	/// Executes `spec` and validates the JSON response body as `T`.
	///
	/// HTTP failures surface as [`Error::Http`], shape mismatches as [`Error::Validation`]; the
	/// latter is never treated as an authentication failure.
	pub async fn execute<T>(&self, spec: RequestSpec) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = self.config.endpoint(&spec.path)?;
		let response = self.dispatch(&spec, &url).await?;

		Ok(http::decode_json(&url, &response.body)?)
	}

	/// Executes `spec` for a caller that expects no content (e.g. `204` on `DELETE`).
	///
	/// The body, if any, is ignored without being parsed.
	pub async fn execute_empty(&self, spec: RequestSpec) -> Result<()> {
		let url = self.config.endpoint(&spec.path)?;

		self.dispatch(&spec, &url).await?;

		Ok(())
	}

	async fn dispatch(&self, spec: &RequestSpec, url: &Url) -> Result<HttpResponse> {
		obs::observe(OpKind::Request, "execute", async {
			let targets_refresh = self.config.is_refresh_target(url);

			if !targets_refresh && self.store.is_expired() {
				// Best-effort; a rejected call still takes the reactive path below.
				if let Err(err) = self.coordinator.ensure_refreshed_once().await {
					obs::log_suppressed(OpKind::Refresh, "proactive_refresh", err.as_ref());
				}
			}

			let response = self.send(spec, url).await?;

			if !response.is_unauthorized() || targets_refresh {
				return http::ensure_success(response);
			}

			match self.coordinator.ensure_refreshed_once().await {
				Ok(_) => http::ensure_success(self.send(spec, url).await?),
				Err(source) => {
					self.store.clear();

					Err(Error::AuthExpired { source })
				},
			}
		})
		.await
	}

	async fn send(&self, spec: &RequestSpec, url: &Url) -> Result<HttpResponse> {
		let request = HttpRequest::new(spec.method, url.clone())
			.with_bearer(self.store.get())
			.with_body(spec.body.clone());

		let response = self.transport.send(request).await?;

		obs::record_response(OpKind::Request, response.status);

		Ok(response)
	}
}
impl<C> Clone for RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<C> Debug for RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("base_url", &self.config.base_url.as_str())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
