//! Client-wide error taxonomy shared across transport, auth, provider, and flow layers.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token exchange failed; fatal for the whole request and never retried automatically.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// A provider operation failed after authentication.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// A location payload did not contain a payment code under any known field name.
	#[error(transparent)]
	PayloadNotFound(#[from] PayloadNotFoundError),
	/// Caller input was rejected before any provider call was issued.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Returns `true` when retrying the failed step may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Error::Provider(provider) if provider.is_transient())
	}
}

/// Token-exchange failures raised by the acquirer.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The token endpoint rejected the client credentials.
	#[error("Token endpoint rejected the client credentials: {error}.")]
	Rejected {
		/// OAuth error code returned by the provider.
		error: String,
		/// Optional human-readable description returned by the provider.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying transport failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive or out-of-range `expires_in`.
	#[error("The expires_in value must be a positive number of seconds.")]
	InvalidExpiresIn,
	/// Token endpoint returned an unexpected but non-OAuth response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Provider- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Failures raised by authenticated provider operations.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// The provider rejected the request payload; retrying will not help.
	#[error("Provider rejected {operation} (HTTP {status}): {body}.")]
	Permanent {
		/// Operation that failed.
		operation: crate::provider::Operation,
		/// HTTP status code returned by the provider.
		status: u16,
		/// Truncated response body for diagnostics.
		body: String,
	},
	/// Upstream or transport failure; the step is safe to retry.
	#[error("Provider call {operation} failed with a retryable error: {message}.")]
	Transient {
		/// Operation that failed.
		operation: crate::provider::Operation,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Provider- or transport-supplied message summarizing the failure.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The provider answered successfully but the body did not match the expected shape.
	#[error("Provider call {operation} returned a response that could not be decoded.")]
	ResponseDecode {
		/// Operation that failed.
		operation: crate::provider::Operation,
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ProviderError {
	/// Returns `true` when the failed call is safe to retry.
	pub fn is_transient(&self) -> bool {
		matches!(self, ProviderError::Transient { .. })
	}
}

/// A location payload carried none of the known payment-code field names.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Location {location_id} payload carries no payment code under any of {fields:?}.")]
pub struct PayloadNotFoundError {
	/// Identifier of the location whose payload was inspected.
	pub location_id: i64,
	/// Field names that were tried, in precedence order.
	pub fields: &'static [&'static str],
}

/// Caller-input validation failures, raised before any provider call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Tax identifier was not an 11-digit CPF or a 14-digit CNPJ.
	#[error("Debtor tax id must contain exactly 11 (CPF) or 14 (CNPJ) digits.")]
	InvalidTaxId,
	/// Debtor name was empty.
	#[error("Debtor name cannot be empty.")]
	EmptyDebtorName,
	/// Contract reference was empty.
	#[error("Contract reference cannot be empty.")]
	EmptyContract,
	/// Amount was not a valid decimal number.
	#[error("Amount could not be parsed as a decimal number.")]
	UnparsableAmount,
	/// Amount was zero or negative.
	#[error("Amount must be positive, got {value}.")]
	NonPositiveAmount {
		/// Rejected value.
		value: Decimal,
	},
	/// Amount carried more than two decimal places.
	#[error("Amount must have at most two decimal places, got {value}.")]
	FractionalCents {
		/// Rejected value.
		value: Decimal,
	},
	/// Cycle start date was not provided.
	#[error("Cycle start date is required.")]
	MissingStartDate,
	/// Periodicity was not provided.
	#[error("Periodicity is required.")]
	MissingPeriodicity,
	/// Mandate value terms were not provided.
	#[error("Mandate value terms are required.")]
	MissingValueTerms,
	/// Charge amount was not provided.
	#[error("Charge amount is required.")]
	MissingAmount,
	/// Retry policy was not provided.
	#[error("Retry policy is required.")]
	MissingRetryPolicy,
	/// End date does not follow the cycle start.
	#[error("End date {end} is not after the cycle start {start}.")]
	EndBeforeStart {
		/// Cycle start date.
		start: Date,
		/// Rejected end date.
		end: Date,
	},
	/// Charge due date does not follow the cycle start.
	#[error("Charge due date {due} is not after the cycle start {start}.")]
	DueBeforeStart {
		/// Cycle start date.
		start: Date,
		/// Rejected due date.
		due: Date,
	},
	/// Caller-supplied transaction id was malformed.
	#[error("Transaction id must be 1-35 alphanumeric characters.")]
	InvalidTransactionId,
}

/// Configuration and channel-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable was absent or empty.
	#[error("Environment variable {name} is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable held an unparsable value.
	#[error("Environment variable {name} holds an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Rejected value.
		value: String,
	},
	/// Provider endpoints must use HTTPS.
	#[error("Provider endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The base URL cannot carry additional path segments.
	#[error("Provider base URL cannot be extended with path segments: {url}.")]
	UnextendableBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Certificate and key paths must be configured together.
	#[error("Client certificate and private key paths must be configured together.")]
	IncompleteIdentity,
	/// A client identity is required but no certificate/key paths were configured.
	#[error("Client identity material is required but no certificate/key paths are configured.")]
	MissingIdentity,
	/// Identity material could not be read from disk.
	#[error("Client identity material could not be read from {path}.")]
	IdentityUnreadable {
		/// Path that failed to read.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Identity PEM material could not be parsed.
	#[error("Client identity PEM material is invalid.")]
	IdentityInvalid {
		/// Underlying parsing failure.
		#[source]
		source: BoxError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
