//! Error taxonomy shared by the credential, refresh, request, and session layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Refresh failure shared by every caller that awaited the same in-flight refresh.
pub type SharedError = Arc<Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The network call itself failed; no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The response body does not match the expected shape.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// A response was received outside the success range.
	#[error("Request failed with HTTP status {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Truncated response body, kept for diagnostics.
		body: String,
	},
	/// Reactive refresh-and-retry failed; the session is no longer valid.
	#[error("Session expired and could not be refreshed.")]
	AuthExpired {
		/// The refresh failure observed by every waiting caller.
		#[source]
		source: SharedError,
	},
}
impl Error {
	/// Builds an [`Error::Http`] from a raw response body, truncating it for diagnostics.
	pub fn http(status: u16, body: &[u8]) -> Self {
		let text = String::from_utf8_lossy(body);
		let body = if text.len() <= BODY_PREVIEW_LIMIT {
			text.into_owned()
		} else {
			let mut end = BODY_PREVIEW_LIMIT;

			while !text.is_char_boundary(end) {
				end -= 1;
			}

			format!("{}... (truncated, {} total bytes)", &text[..end], text.len())
		};

		Self::Http { status, body }
	}

	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` for an HTTP 401 response.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}

	/// Returns `true` when the session can no longer be refreshed.
	pub fn is_auth_expired(&self) -> bool {
		matches!(self, Self::AuthExpired { .. })
	}
}

/// Configuration failures raised while building clients or requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL or endpoint path cannot be parsed.
	#[error("The {endpoint} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The base URL uses plain HTTP for a non-loopback host.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL cannot carry a path (e.g. `mailto:`).
	#[error("The base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// A request path resolved outside the base URL's origin.
	#[error("The request URL {url} is outside the configured origin.")]
	ForeignOrigin {
		/// Resolved URL that was rejected.
		url: String,
	},
	/// A configured duration must be strictly positive.
	#[error("The {setting} setting must be positive.")]
	NonPositiveDuration {
		/// Setting name.
		setting: &'static str,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be encoded as JSON.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Response bodies that were received but do not match the expected shape.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// The body could not be deserialized into the expected type.
	#[error("Response from {endpoint} does not match the expected shape at `{}`.", .source.path())]
	Shape {
		/// Path of the endpoint that produced the body.
		endpoint: String,
		/// Structured deserialization failure, including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The body parsed but carried trailing data.
	#[error("Response from {endpoint} contains trailing data.")]
	Malformed {
		/// Path of the endpoint that produced the body.
		endpoint: String,
		/// Underlying parser failure.
		#[source]
		source: serde_json::Error,
	},
	/// The identity service returned a lifetime that is zero or negative.
	#[error("The expires_in value must be positive, got {expires_in}.")]
	NonPositiveExpiresIn {
		/// Lifetime in seconds as returned by the server.
		expires_in: i64,
	},
	/// The identity service returned a lifetime whose expiry instant cannot be represented.
	#[error("The expires_in value {expires_in} is out of range.")]
	ExpiresInOutOfRange {
		/// Lifetime in seconds as returned by the server.
		expires_in: i64,
	},
	/// The identity service returned an empty access token.
	#[error("The access_token value must not be empty.")]
	EmptyAccessToken,
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error(
		"Network error occurred while calling {target}.",
		target = .url.as_deref().unwrap_or("the server")
	)]
	Network {
		/// Target URL, when known.
		url: Option<String>,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: None, source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			return Self::Timeout;
		}

		let url = e.url().map(ToString::to_string);

		Self::Network { url, source: Box::new(e) }
	}
}
