//! Transport layer for provider calls.
//!
//! [`ProviderChannel`] wraps the shared [`ReqwestClient`] carrying the mutual-TLS client
//! identity, bounded timeouts, and the server-verification policy from [`ProviderConfig`].
//! The same channel serves both the token endpoint (through the [`oauth2`]-facing
//! [`ChannelHandle`] adapter, which records response metadata for error mapping) and the
//! authenticated recurrence endpoints.

// std
use std::{fs, ops::Deref, path::Path};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	Identity,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, config::ProviderConfig, error::ConfigError, obs};

/// Shared HTTP channel used for every outbound provider request.
///
/// Token requests must not follow redirects, matching OAuth 2.0 guidance that token
/// endpoints return results directly; the channel therefore disables redirect following
/// for all calls.
#[derive(Clone, Debug)]
pub struct ProviderChannel(ReqwestClient);
impl ProviderChannel {
	/// Builds the channel described by the configuration.
	///
	/// Identity material is loaded eagerly so misconfigured deployments fail at startup
	/// instead of on the first provider call. When `require_client_identity` is disabled,
	/// missing or unreadable material degrades to a channel without a client identity and a
	/// warning is logged.
	pub fn build(config: &ProviderConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.use_rustls_tls()
			.redirect(Policy::none())
			.connect_timeout(config.connect_timeout)
			.timeout(config.request_timeout);

		match load_identity(config)? {
			Some(identity) => builder = builder.identity(identity),
			None => obs::warn_degraded_transport("operating without a client identity"),
		}

		if !config.verify_server {
			obs::warn_degraded_transport("server certificate verification is disabled");

			builder = builder.danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true);
		}

		builder.build().map(Self).map_err(ConfigError::from)
	}

	/// Wraps an existing [`ReqwestClient`], bypassing identity loading.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented token-exchange handle that records response metadata in `slot`.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> ChannelHandle {
		ChannelHandle { client: self.0.clone(), slot }
	}
}
impl AsRef<ReqwestClient> for ProviderChannel {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ProviderChannel {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot sharing [`ResponseMetadata`] between the transport and error layers.
///
/// A fresh slot is created for each token request; the adapter clears it before
/// dispatching so traces from prior attempts never leak into a new invocation.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter backing the token exchange.
pub(crate) struct ChannelHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ChannelHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let response = client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(&headers),
			});

			let mut mapped = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*mapped.status_mut() = status;
			*mapped.headers_mut() = headers;

			Ok(mapped)
		})
	}
}

fn load_identity(config: &ProviderConfig) -> Result<Option<Identity>, ConfigError> {
	let (certificate, key) = match (&config.certificate_path, &config.private_key_path) {
		(Some(certificate), Some(key)) => (certificate, key),
		(None, None) if !config.require_client_identity => return Ok(None),
		(None, None) => return Err(ConfigError::MissingIdentity),
		_ => return Err(ConfigError::IncompleteIdentity),
	};

	match read_identity_pem(certificate, key) {
		Ok(pem) => Identity::from_pem(&pem)
			.map(Some)
			.map_err(|source| ConfigError::IdentityInvalid { source: Box::new(source) }),
		Err(_) if !config.require_client_identity => {
			obs::warn_degraded_transport("client identity material is unreadable");

			Ok(None)
		},
		Err(err) => Err(err),
	}
}

fn read_identity_pem(certificate: &Path, key: &Path) -> Result<Vec<u8>, ConfigError> {
	let mut pem = fs::read(certificate).map_err(|source| ConfigError::IdentityUnreadable {
		path: certificate.to_owned(),
		source,
	})?;
	let key_pem = fs::read(key)
		.map_err(|source| ConfigError::IdentityUnreadable { path: key.to_owned(), source })?;

	pem.push(b'\n');
	pem.extend_from_slice(&key_pem);

	Ok(pem)
}

/// Parses a Retry-After header into a relative duration, accepting both delta-seconds and
/// HTTP-date forms.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	fn sandbox_config() -> ProviderConfig {
		ProviderConfig::builder(
			Url::parse("https://sandbox.example.com/v1")
				.expect("Sandbox URL fixture should parse successfully."),
			"app-key",
			"client",
			"secret",
		)
		.require_client_identity(false)
		.build()
		.expect("Sandbox configuration should build successfully.")
	}

	#[test]
	fn channel_builds_without_identity_when_not_required() {
		let channel = ProviderChannel::build(&sandbox_config());

		assert!(channel.is_ok());
	}

	#[test]
	fn channel_requires_identity_by_default() {
		let config = ProviderConfig::builder(
			Url::parse("https://api.example.com/v1")
				.expect("URL fixture should parse successfully."),
			"app-key",
			"client",
			"secret",
		)
		.build()
		.expect("Configuration should build successfully.");
		let err = ProviderChannel::build(&config)
			.expect_err("A production-style configuration without identity paths must not build.");

		assert!(matches!(err, ConfigError::MissingIdentity));
	}

	#[test]
	fn unreadable_identity_is_an_error_when_required() {
		let config = ProviderConfig::builder(
			Url::parse("https://api.example.com/v1")
				.expect("URL fixture should parse successfully."),
			"app-key",
			"client",
			"secret",
		)
		.identity("/nonexistent/client.pem", "/nonexistent/client.key")
		.build()
		.expect("Configuration should build successfully.");
		let err = ProviderChannel::build(&config)
			.expect_err("Unreadable identity material must fail a strict configuration.");

		assert!(matches!(err, ConfigError::IdentityUnreadable { .. }));
	}

	#[test]
	fn unreadable_identity_degrades_when_not_required() {
		let config = ProviderConfig::builder(
			Url::parse("https://sandbox.example.com/v1")
				.expect("URL fixture should parse successfully."),
			"app-key",
			"client",
			"secret",
		)
		.identity("/nonexistent/client.pem", "/nonexistent/client.key")
		.require_client_identity(false)
		.build()
		.expect("Configuration should build successfully.");

		assert!(ProviderChannel::build(&config).is_ok());
	}

	#[test]
	fn metadata_slot_consumes_on_take() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(502), retry_after: None });

		let meta = slot.take().expect("Stored metadata should be retrievable once.");

		assert_eq!(meta.status, Some(502));
		assert!(slot.take().is_none());
	}

	#[test]
	fn retry_after_parses_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(120)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("not-a-date"));

		assert_eq!(parse_retry_after(&headers), None);
	}
}
