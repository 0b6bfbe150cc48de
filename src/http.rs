//! Transport primitives for identity and application calls.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. Implementations must carry
//! an HTTP-level credential (a cookie jar) across calls on their own; the bearer token travels
//! separately on [`HttpRequest::bearer`]. The reqwest-backed [`ReqwestTransport`] keeps cookies in
//! memory so `POST /auth/refresh` works even after the access token has been dropped.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{ACCEPT, CONTENT_TYPE};
// self
#[cfg(feature = "reqwest")] use crate::config::ClientConfig;
use crate::{
	_prelude::*,
	credential::TokenSecret,
	error::{ConfigError, TransportError, ValidationError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients able to issue one request and return the raw response.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` once. Non-2xx statuses are responses, not errors.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP methods issued by the request layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Fully resolved outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Bearer token to attach as `Authorization: Bearer <token>`.
	pub bearer: Option<TokenSecret>,
	/// JSON-encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a request without bearer or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, bearer: None, body: None }
	}

	/// Attaches a bearer token when one is available.
	pub fn with_bearer(mut self, bearer: Option<TokenSecret>) -> Self {
		self.bearer = bearer;

		self
	}

	/// Attaches a JSON-encoded body.
	pub fn with_body(mut self, body: Option<Vec<u8>>) -> Self {
		self.body = body;

		self
	}
}

/// Raw response handed back by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes (possibly empty).
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for HTTP 401.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}
}

/// Converts a non-2xx response into [`Error::Http`].
pub(crate) fn ensure_success(response: HttpResponse) -> Result<HttpResponse> {
	if response.is_success() {
		Ok(response)
	} else {
		Err(Error::http(response.status, &response.body))
	}
}

/// Validates a JSON body against `T`, reporting the failing field path.
pub(crate) fn decode_json<T>(url: &Url, body: &[u8]) -> Result<T, ValidationError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ValidationError::Shape { endpoint: url.path().to_owned(), source })?;

	de.end()
		.map_err(|source| ValidationError::Malformed { endpoint: url.path().to_owned(), source })?;

	Ok(value)
}

/// Encodes a request body as JSON.
pub(crate) fn encode_json<B>(body: &B) -> Result<Vec<u8>, ConfigError>
where
	B: ?Sized + Serialize,
{
	serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })
}

/// Thin wrapper around [`ReqwestClient`] with an in-memory cookie jar.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`]. The client should keep a cookie store,
	/// otherwise refresh cannot rely on the HTTP-level credential.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the configured timeout and user agent.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.timeout(config.request_timeout.unsigned_abs())
			.user_agent(config.user_agent.as_str())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client
				.request(request.method.into(), request.url)
				.header(ACCEPT, "application/json");

			if let Some(bearer) = request.bearer.as_ref() {
				builder = builder.bearer_auth(bearer.expose());
			}
			if let Some(body) = request.body {
				builder = builder.header(CONTENT_TYPE, "application/json").body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}
