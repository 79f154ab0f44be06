//! Client-credentials token acquisition against the provider token endpoint.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential, CredentialCache},
	config::{ClientAuthMethod, ProviderConfig},
	error::AuthError,
	http::{ProviderChannel, ResponseMetadata, ResponseMetadataSlot},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type ConfiguredTokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Acquires bearer tokens through the `client_credentials` grant, reusing cached credentials
/// while they remain inside the expiry safety margin.
///
/// The cache is shared; concurrent callers that both miss simply perform duplicate exchanges
/// and race to store the result, which is harmless (see [`CredentialCache`]). No retry happens
/// at this layer—retry policy belongs to the caller.
#[derive(Clone, Debug)]
pub struct TokenClient {
	config: Arc<ProviderConfig>,
	channel: ProviderChannel,
	cache: Arc<CredentialCache>,
}
impl TokenClient {
	/// Creates an acquirer with its own empty credential cache.
	pub fn new(config: Arc<ProviderConfig>, channel: ProviderChannel) -> Self {
		Self::with_cache(config, channel, Arc::new(CredentialCache::default()))
	}

	/// Creates an acquirer sharing an existing credential cache.
	pub fn with_cache(
		config: Arc<ProviderConfig>,
		channel: ProviderChannel,
		cache: Arc<CredentialCache>,
	) -> Self {
		Self { config, channel, cache }
	}

	/// Returns the shared credential cache.
	pub fn cache(&self) -> &Arc<CredentialCache> {
		&self.cache
	}

	/// Returns a usable bearer token, exchanging client credentials only on a cache miss.
	pub async fn valid_token(&self) -> Result<AccessToken, AuthError> {
		if let Some(credential) = self.cache.get() {
			return Ok(credential.token);
		}

		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange()).await;

		match &result {
			Ok(credential) => {
				self.cache.store(credential.clone());

				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result.map(|credential| credential.token)
	}

	async fn exchange(&self) -> Result<Credential, AuthError> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.channel.instrumented(slot.clone());
		let oauth_client = self.oauth_client();
		let response = oauth_client
			.exchange_client_credentials()
			.request_async(&handle)
			.await
			.map_err(|err| map_token_error(slot.take(), err))?;
		let expires_in = response.expires_in().ok_or(AuthError::MissingExpiresIn)?.as_secs();
		let expires_in = i64::try_from(expires_in).map_err(|_| AuthError::InvalidExpiresIn)?;

		if expires_in <= 0 {
			return Err(AuthError::InvalidExpiresIn);
		}

		let token = AccessToken::new(response.access_token().secret().to_owned());

		Ok(Credential::new(token, OffsetDateTime::now_utc() + Duration::seconds(expires_in)))
	}

	fn oauth_client(&self) -> ConfiguredTokenClient {
		let mut oauth_client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
			.set_client_secret(ClientSecret::new(self.config.client_secret.clone()))
			.set_token_uri(TokenUrl::from_url(self.config.token_url.clone()));

		if matches!(self.config.client_auth, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		oauth_client
	}
}

fn map_token_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> AuthError {
	let status = meta.as_ref().and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) => AuthError::Rejected {
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			status,
		},
		RequestTokenError::Request(error) => AuthError::Transport { source: Box::new(error) },
		RequestTokenError::Parse(source, _body) => AuthError::ResponseParse { source, status },
		RequestTokenError::Other(message) => AuthError::Unexpected { message, status },
	}
}
