//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
// self
use session_broker::{
	client::Client,
	config::ClientConfig,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportFuture},
	url::Url,
};

/// Login/refresh body issuing `access-1` for 30 minutes.
pub const GRANT_BODY: &str = r#"{
	"user": {"id": "user-1", "email": "ada@example.com", "created_at": "2025-01-01T00:00:00Z"},
	"access_token": "access-1",
	"token_type": "bearer",
	"expires_in": 1800
}"#;
/// Refresh body issuing `access-2`.
pub const ROTATED_GRANT_BODY: &str = r#"{
	"user": {"id": "user-1", "email": "ada@example.com", "created_at": "2025-01-01T00:00:00Z"},
	"access_token": "access-2",
	"token_type": "bearer",
	"expires_in": 1800
}"#;
/// `GET /auth/me` body.
pub const IDENTITY_BODY: &str =
	r#"{"id": "user-1", "email": "ada@example.com", "created_at": "2025-01-01T00:00:00Z"}"#;
/// `POST /auth/logout` body.
pub const LOGOUT_BODY: &str = r#"{"message": "Logged out", "success": true}"#;

pub const LOGIN: &str = "/api/auth/login";
pub const REFRESH: &str = "/api/auth/refresh";
pub const LOGOUT: &str = "/api/auth/logout";
pub const ME: &str = "/api/auth/me";

/// One canned transport outcome.
#[derive(Clone, Debug)]
pub enum Reply {
	/// Respond immediately.
	Status(u16, String),
	/// Respond after sleeping on the tokio timer.
	Delayed(u16, String, StdDuration),
	/// Fail without a response.
	Fail,
}
impl Reply {
	pub fn status(status: u16, body: &str) -> Self {
		Self::Status(status, body.to_owned())
	}

	pub fn delayed(status: u16, body: &str, delay: StdDuration) -> Self {
		Self::Delayed(status, body.to_owned(), delay)
	}
}

#[derive(Default)]
struct Route {
	queue: VecDeque<Reply>,
	fallback: Option<Reply>,
	calls: usize,
}

/// Transport that answers from per-route scripts and records every request.
///
/// Queued replies are consumed first; once a route's queue is empty its fallback answers. Routes
/// without a script answer `404`.
#[derive(Default)]
pub struct ScriptedTransport {
	routes: Mutex<HashMap<(Method, String), Route>>,
	log: Mutex<Vec<HttpRequest>>,
}
impl ScriptedTransport {
	pub fn enqueue(&self, method: Method, path: &str, reply: Reply) -> &Self {
		self.routes.lock().entry((method, path.to_owned())).or_default().queue.push_back(reply);

		self
	}

	pub fn always(&self, method: Method, path: &str, reply: Reply) -> &Self {
		self.routes.lock().entry((method, path.to_owned())).or_default().fallback = Some(reply);

		self
	}

	pub fn calls(&self, method: Method, path: &str) -> usize {
		self.routes.lock().get(&(method, path.to_owned())).map_or(0, |route| route.calls)
	}

	pub fn requests(&self) -> Vec<HttpRequest> {
		self.log.lock().clone()
	}

	pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
		self.requests()
			.into_iter()
			.filter(|request| request.method == method && request.url.path() == path)
			.collect()
	}

	fn next_reply(&self, request: &HttpRequest) -> Reply {
		self.log.lock().push(request.clone());

		let mut routes = self.routes.lock();
		let Some(route) = routes.get_mut(&(request.method, request.url.path().to_owned())) else {
			return Reply::status(404, "");
		};

		route.calls += 1;

		route
			.queue
			.pop_front()
			.or_else(|| route.fallback.clone())
			.unwrap_or_else(|| Reply::status(404, ""))
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let reply = self.next_reply(&request);

		Box::pin(async move {
			match reply {
				Reply::Status(status, body) => Ok(HttpResponse { status, body: body.into_bytes() }),
				Reply::Delayed(status, body, delay) => {
					tokio::time::sleep(delay).await;

					Ok(HttpResponse { status, body: body.into_bytes() })
				},
				Reply::Fail => Err(TransportError::network(std::io::Error::other(
					"connection reset by peer",
				))),
			}
		})
	}
}

/// Bearer attached to `request`, exposed for assertions.
pub fn bearer_of(request: &HttpRequest) -> Option<&str> {
	request.bearer.as_ref().map(|secret| secret.expose())
}

/// Loopback configuration rooted at `/api/`.
pub fn test_config() -> ClientConfig {
	config_for("http://127.0.0.1:9/api/")
}

pub fn config_for(base_url: &str) -> ClientConfig {
	ClientConfig::builder(Url::parse(base_url).expect("Test base URL should parse."))
		.build()
		.expect("Test configuration should build.")
}

/// Client wired to a fresh [`ScriptedTransport`], returned alongside it for scripting.
pub fn build_scripted_client() -> (Client<ScriptedTransport>, Arc<ScriptedTransport>) {
	let transport = Arc::new(ScriptedTransport::default());
	let client = Client::with_transport(test_config(), transport.clone());

	(client, transport)
}
