//! Validated client configuration: base URL, identity endpoint paths, and timing knobs.

// self
use crate::{_prelude::*, credential::DEFAULT_TOKEN_LIFETIME, error::ConfigError};

/// Default bound on every network call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// Identity endpoint paths, relative to [`ClientConfig::base_url`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// `POST` credentials, returns a grant.
	pub login: String,
	/// `POST` without body, relies on the session cookie.
	pub refresh: String,
	/// `POST` without body.
	pub logout: String,
	/// `GET` the current identity.
	pub me: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "auth/login".into(),
			refresh: "auth/refresh".into(),
			logout: "auth/logout".into(),
			me: "auth/me".into(),
		}
	}
}

/// Immutable configuration consumed by every component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Identity endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Upper bound for a single network call.
	pub request_timeout: Duration,
	/// Credential lifetime assumed when the server omits `expires_in`.
	pub default_token_lifetime: Duration,
	/// `User-Agent` header sent by the reqwest transport.
	pub user_agent: String,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` against the base URL. Leading slashes are ignored so paths stay under the
	/// base path; absolute URLs pointing at another origin are rejected so the bearer token never
	/// leaves it.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let url = self
			.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidUrl { endpoint: "request", source })?;

		if url.origin() != self.base_url.origin() {
			return Err(ConfigError::ForeignOrigin { url: url.to_string() });
		}

		Ok(url)
	}

	/// Absolute login endpoint.
	pub fn login_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.endpoints.login)
	}

	/// Absolute refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.endpoints.refresh)
	}

	/// Absolute logout endpoint.
	pub fn logout_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.endpoints.logout)
	}

	/// Absolute current-identity endpoint.
	pub fn me_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.endpoints.me)
	}

	/// Returns `true` if `url` targets the refresh endpoint.
	pub fn is_refresh_target(&self, url: &Url) -> bool {
		self.refresh_url().is_ok_and(|refresh| {
			refresh.origin() == url.origin()
				&& refresh.path().trim_end_matches('/') == url.path().trim_end_matches('/')
		})
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { url: self.base_url.to_string() });
		}
		if self.base_url.scheme() != "https" && !is_loopback_http(&self.base_url) {
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.to_string() });
		}
		if !self.request_timeout.is_positive() {
			return Err(ConfigError::NonPositiveDuration { setting: "request_timeout" });
		}
		if !self.default_token_lifetime.is_positive() {
			return Err(ConfigError::NonPositiveDuration { setting: "default_token_lifetime" });
		}

		for (endpoint, path) in [
			("login", &self.endpoints.login),
			("refresh", &self.endpoints.refresh),
			("logout", &self.endpoints.logout),
			("me", &self.endpoints.me),
		] {
			let resolved = self
				.base_url
				.join(path.trim_start_matches('/'))
				.map_err(|source| ConfigError::InvalidUrl { endpoint, source })?;

			if resolved.origin() != self.base_url.origin() {
				return Err(ConfigError::ForeignOrigin { url: resolved.to_string() });
			}
		}

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every request.
	pub base_url: Url,
	/// Identity endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Upper bound for a single network call.
	pub request_timeout: Duration,
	/// Fallback credential lifetime.
	pub default_token_lifetime: Duration,
	/// `User-Agent` header value.
	pub user_agent: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			default_token_lifetime: DEFAULT_TOKEN_LIFETIME,
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
		}
	}

	/// Overrides the identity endpoint paths.
	pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the per-call timeout (defaults to 30 seconds).
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the fallback credential lifetime (defaults to 30 minutes).
	pub fn default_token_lifetime(mut self, lifetime: Duration) -> Self {
		self.default_token_lifetime = lifetime;

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let mut base_url = self.base_url;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let config = ClientConfig {
			base_url,
			endpoints: self.endpoints,
			request_timeout: self.request_timeout,
			default_token_lifetime: self.default_token_lifetime,
			user_agent: self.user_agent,
		};

		config.validate()?;

		Ok(config)
	}
}

fn is_loopback_http(url: &Url) -> bool {
	if url.scheme() != "http" {
		return false;
	}

	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	#[test]
	fn builder_normalizes_base_path_and_resolves_endpoints() {
		let config = ClientConfig::builder(url("https://shop.example.com/api"))
			.build()
			.expect("HTTPS configuration should build.");

		assert_eq!(config.base_url.as_str(), "https://shop.example.com/api/");
		assert_eq!(
			config.login_url().expect("Login URL should resolve.").as_str(),
			"https://shop.example.com/api/auth/login"
		);
		assert_eq!(
			config.endpoint("/products?page=2").expect("Path should resolve.").as_str(),
			"https://shop.example.com/api/products?page=2"
		);
		assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
		assert_eq!(config.default_token_lifetime, Duration::minutes(30));
	}

	#[test]
	fn builder_rejects_plain_http_for_remote_hosts() {
		let err = ClientConfig::builder(url("http://shop.example.com/"))
			.build()
			.expect_err("Remote plain HTTP should be rejected.");

		assert!(matches!(err, ConfigError::InsecureBaseUrl { .. }));

		for loopback in ["http://localhost:8000/", "http://127.0.0.1:8000/", "http://[::1]:8000/"] {
			assert!(ClientConfig::builder(url(loopback)).build().is_ok(), "{loopback}");
		}
	}

	#[test]
	fn builder_rejects_non_positive_durations() {
		let err = ClientConfig::builder(url("https://shop.example.com/"))
			.request_timeout(Duration::ZERO)
			.build()
			.expect_err("A zero timeout should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveDuration { setting: "request_timeout" }));

		let err = ClientConfig::builder(url("https://shop.example.com/"))
			.default_token_lifetime(Duration::seconds(-5))
			.build()
			.expect_err("A negative lifetime should be rejected.");

		assert!(matches!(
			err,
			ConfigError::NonPositiveDuration { setting: "default_token_lifetime" }
		));
	}

	#[test]
	fn refresh_target_detection_ignores_query_and_trailing_slash() {
		let config = ClientConfig::builder(url("https://shop.example.com/api/"))
			.build()
			.expect("Configuration should build.");

		assert!(config.is_refresh_target(&url("https://shop.example.com/api/auth/refresh")));
		assert!(config.is_refresh_target(&url("https://shop.example.com/api/auth/refresh/?x=1")));
		assert!(!config.is_refresh_target(&url("https://shop.example.com/api/auth/me")));
		assert!(!config.is_refresh_target(&url("https://other.example.com/api/auth/refresh")));
	}

	#[test]
	fn endpoint_rejects_foreign_origins() {
		let config = ClientConfig::builder(url("https://shop.example.com/api/"))
			.build()
			.expect("Configuration should build.");

		for foreign in [
			"https://attacker.example.net/collect",
			"http://shop.example.com/api/orders",
			"https://shop.example.com:8443/api/orders",
		] {
			assert!(
				matches!(config.endpoint(foreign), Err(ConfigError::ForeignOrigin { .. })),
				"{foreign}"
			);
		}

		assert_eq!(
			config
				.endpoint("https://shop.example.com/api/orders")
				.expect("Same-origin absolute URL should resolve.")
				.as_str(),
			"https://shop.example.com/api/orders"
		);
	}

	#[test]
	fn config_round_trips_through_json() {
		let config = ClientConfig::builder(url("https://shop.example.com/api/"))
			.endpoints(AuthEndpoints { me: "users/me".into(), ..AuthEndpoints::default() })
			.user_agent("storefront/2.1")
			.build()
			.expect("Configuration should build.");
		let payload = serde_json::to_string(&config).expect("Configuration should serialize.");
		let parsed: ClientConfig =
			serde_json::from_str(&payload).expect("Configuration should deserialize.");

		assert_eq!(parsed, config);
		assert_eq!(
			parsed.me_url().expect("Me URL should resolve.").as_str(),
			"https://shop.example.com/api/users/me"
		);
	}
}
