//! Provider configuration: builder-validated settings plus environment loading.

// std
use std::{
	env,
	path::PathBuf,
	time::Duration as StdDuration,
};
// self
use crate::{_prelude::*, error::ConfigError};

const ENV_BASE_URL: &str = "PIX_BASE_URL";
const ENV_TOKEN_URL: &str = "PIX_TOKEN_URL";
const ENV_APPLICATION_KEY: &str = "PIX_APPLICATION_KEY";
const ENV_CLIENT_ID: &str = "PIX_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "PIX_CLIENT_SECRET";
const ENV_CERT_PATH: &str = "PIX_CERT_PATH";
const ENV_KEY_PATH: &str = "PIX_KEY_PATH";
const ENV_VERIFY_SERVER: &str = "PIX_VERIFY_SERVER";
const ENV_REQUIRE_CLIENT_IDENTITY: &str = "PIX_REQUIRE_CLIENT_IDENTITY";

const DEFAULT_TOKEN_PATH: [&str; 2] = ["oauth", "token"];
const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Client authentication styles accepted by the provider token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientAuthMethod {
	/// Credentials travel in the `Authorization: Basic` header.
	#[default]
	ClientSecretBasic,
	/// Credentials travel in the form body, for provider versions that reject Basic auth.
	ClientSecretPost,
}

/// Validated configuration for one provider environment.
#[derive(Clone)]
pub struct ProviderConfig {
	/// Base URL all recurrence endpoints hang off.
	pub base_url: Url,
	/// Token endpoint; defaults to `{base_url}/oauth/token`.
	pub token_url: Url,
	/// Value of the provider application-key header sent with every call.
	pub application_key: String,
	/// OAuth client identifier.
	pub client_id: String,
	pub(crate) client_secret: String,
	/// How client credentials are presented to the token endpoint.
	pub client_auth: ClientAuthMethod,
	/// Path to the client certificate PEM, when mutual TLS is configured.
	pub certificate_path: Option<PathBuf>,
	/// Path to the client private-key PEM, when mutual TLS is configured.
	pub private_key_path: Option<PathBuf>,
	/// Whether the provider's server certificate is verified. Disable only against sandboxes.
	pub verify_server: bool,
	/// Whether missing/unreadable identity material is an error instead of a degraded channel.
	pub require_client_identity: bool,
	/// Connection-establishment timeout for every outbound call.
	pub connect_timeout: StdDuration,
	/// Total per-request timeout for every outbound call.
	pub request_timeout: StdDuration,
}
impl ProviderConfig {
	/// Returns a builder seeded with the required provider coordinates.
	pub fn builder(
		base_url: Url,
		application_key: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(base_url, application_key, client_id, client_secret)
	}

	/// Loads the configuration from `PIX_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		let base_url = parse_url(ENV_BASE_URL, &required_var(ENV_BASE_URL)?)?;
		let mut builder = Self::builder(
			base_url,
			required_var(ENV_APPLICATION_KEY)?,
			required_var(ENV_CLIENT_ID)?,
			required_var(ENV_CLIENT_SECRET)?,
		);

		if let Some(raw) = optional_var(ENV_TOKEN_URL) {
			builder = builder.token_url(parse_url(ENV_TOKEN_URL, &raw)?);
		}

		match (optional_var(ENV_CERT_PATH), optional_var(ENV_KEY_PATH)) {
			(Some(cert), Some(key)) => builder = builder.identity(cert, key),
			(None, None) => (),
			_ => return Err(ConfigError::IncompleteIdentity),
		}

		if let Some(raw) = optional_var(ENV_VERIFY_SERVER) {
			builder = builder.verify_server(parse_bool(ENV_VERIFY_SERVER, &raw)?);
		}
		if let Some(raw) = optional_var(ENV_REQUIRE_CLIENT_IDENTITY) {
			builder = builder.require_client_identity(parse_bool(ENV_REQUIRE_CLIENT_IDENTITY, &raw)?);
		}

		builder.build()
	}
}
impl Debug for ProviderConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderConfig")
			.field("base_url", &self.base_url.as_str())
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("client_auth", &self.client_auth)
			.field("certificate_path", &self.certificate_path)
			.field("private_key_path", &self.private_key_path)
			.field("verify_server", &self.verify_server)
			.field("require_client_identity", &self.require_client_identity)
			.finish()
	}
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	base_url: Url,
	token_url: Option<Url>,
	application_key: String,
	client_id: String,
	client_secret: String,
	client_auth: ClientAuthMethod,
	certificate_path: Option<PathBuf>,
	private_key_path: Option<PathBuf>,
	verify_server: bool,
	require_client_identity: bool,
	connect_timeout: StdDuration,
	request_timeout: StdDuration,
}
impl ProviderConfigBuilder {
	fn new(
		base_url: Url,
		application_key: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			base_url,
			token_url: None,
			application_key: application_key.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			client_auth: ClientAuthMethod::default(),
			certificate_path: None,
			private_key_path: None,
			verify_server: true,
			require_client_identity: true,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Configures the client certificate/key pair used for mutual TLS.
	pub fn identity(mut self, certificate: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
		self.certificate_path = Some(certificate.into());
		self.private_key_path = Some(key.into());

		self
	}

	/// Overrides the client authentication style for the token endpoint.
	pub fn client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Toggles server-certificate verification (sandbox interoperability only).
	pub fn verify_server(mut self, verify: bool) -> Self {
		self.verify_server = verify;

		self
	}

	/// Toggles whether a missing client identity is an error or a degraded channel.
	pub fn require_client_identity(mut self, require: bool) -> Self {
		self.require_client_identity = require;

		self
	}

	/// Overrides the connection-establishment timeout.
	pub fn connect_timeout(mut self, timeout: StdDuration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Overrides the total per-request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ConfigError> {
		let token_url = match self.token_url {
			Some(url) => url,
			None => join_segments(&self.base_url, &DEFAULT_TOKEN_PATH)?,
		};
		let config = ProviderConfig {
			base_url: self.base_url,
			token_url,
			application_key: self.application_key,
			client_id: self.client_id,
			client_secret: self.client_secret,
			client_auth: self.client_auth,
			certificate_path: self.certificate_path,
			private_key_path: self.private_key_path,
			verify_server: self.verify_server,
			require_client_identity: self.require_client_identity,
			connect_timeout: self.connect_timeout,
			request_timeout: self.request_timeout,
		};

		validate_endpoint(&config.base_url)?;
		validate_endpoint(&config.token_url)?;

		if config.certificate_path.is_some() != config.private_key_path.is_some() {
			return Err(ConfigError::IncompleteIdentity);
		}

		Ok(config)
	}
}

/// Appends path segments to a base URL without disturbing its existing path.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ConfigError> {
	let mut url = base.clone();

	{
		let mut path = url
			.path_segments_mut()
			.map_err(|()| ConfigError::UnextendableBaseUrl { url: base.to_string() })?;

		path.pop_if_empty();

		for segment in segments {
			path.push(segment);
		}
	}

	Ok(url)
}

fn validate_endpoint(url: &Url) -> Result<(), ConfigError> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { url: url.to_string() })
	}
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
	optional_var(name).ok_or(ConfigError::MissingEnv { name })
}

fn optional_var(name: &'static str) -> Option<String> {
	env::var(name).ok().map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|_| ConfigError::InvalidEnv { name, value: raw.to_owned() })
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
	match raw.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" => Ok(true),
		"0" | "false" | "no" => Ok(false),
		_ => Err(ConfigError::InvalidEnv { name, value: raw.to_owned() }),
	}
}
