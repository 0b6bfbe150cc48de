//! Facade wiring one credential store, refresh coordinator, executor, and session per process.

// self
use crate::{
	_prelude::*,
	auth::AuthClient,
	config::ClientConfig,
	credential::CredentialStore,
	executor::RequestExecutor,
	http::HttpTransport,
	refresh::RefreshCoordinator,
	session::SessionController,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = Client<ReqwestTransport>;

/// Shares a single [`CredentialStore`] and [`RefreshCoordinator`] between the request layer and
/// the session layer.
///
/// Construct one per process and hand clones (or the individual `Arc`s) to whoever needs them.
/// Every component reads and writes the same store, so a refresh triggered by the executor is
/// immediately visible to the session controller and vice versa.
pub struct Client<C>
where
	C: ?Sized + HttpTransport,
{
	/// Resolved configuration.
	pub config: Arc<ClientConfig>,
	/// The process-wide credential.
	pub store: Arc<CredentialStore>,
	/// Identity service client.
	pub auth: AuthClient<C>,
	/// Single-flight refresh shared by the executor and the session controller.
	pub refresh: Arc<RefreshCoordinator<C>>,
	/// Application call executor.
	pub executor: RequestExecutor<C>,
	/// Session state machine consumed by the UI layer.
	pub session: Arc<SessionController<C>>,
}
impl<C> Client<C>
where
	C: ?Sized + HttpTransport,
{
	/// Builds the component graph on top of a caller-provided transport.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<C>>) -> Self {
		let transport = transport.into();
		let config = Arc::new(config);
		let store = Arc::new(CredentialStore::with_default_lifetime(config.default_token_lifetime));
		let auth = AuthClient::new(transport.clone(), config.clone(), store.clone());
		let refresh = Arc::new(RefreshCoordinator::new(auth.clone()));
		let executor =
			RequestExecutor::new(transport, config.clone(), store.clone(), refresh.clone());
		let session = Arc::new(SessionController::new(auth.clone(), refresh.clone()));

		Self { config, store, auth, refresh, executor, session }
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client backed by a cookie-carrying reqwest transport built from `config`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport))
	}
}
impl<C> Clone for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			store: self.store.clone(),
			auth: self.auth.clone(),
			refresh: self.refresh.clone(),
			executor: self.executor.clone(),
			session: self.session.clone(),
		}
	}
}
impl<C> Debug for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.field("session", &self.session)
			.finish()
	}
}
