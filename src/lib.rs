//! PIX Automático recurring-payment client—mutual-TLS transport, expiry-aware client-credentials
//! authentication, and journey orchestration for provider-side payment mandates.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod journey;
pub mod model;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ProviderConfig,
		flows::Orchestrator,
		journey::Journey,
		model::{Amount, Debtor, Periodicity, RecurrenceRequest, RetryPolicy, TaxId, ValueTerms},
		provider::ProviderClient,
		store::{MemoryStore, RecurrenceStore},
	};

	/// Builds a sandbox-style configuration pointing at a mock provider base URL.
	///
	/// Server verification is disabled so the channel accepts the self-signed certificates
	/// produced by `httpmock` during tests, and no client identity is required.
	pub fn test_provider_config(base_url: &str) -> ProviderConfig {
		ProviderConfig::builder(
			Url::parse(base_url).expect("Failed to parse mock provider base URL."),
			"app-key-test",
			"client-id-test",
			"client-secret-test",
		)
		.verify_server(false)
		.require_client_identity(false)
		.build()
		.expect("Failed to build sandbox provider configuration.")
	}

	/// Builds a provider client whose channel tolerates the mock server's certificates.
	pub fn test_provider_client(base_url: &str) -> ProviderClient {
		ProviderClient::new(Arc::new(test_provider_config(base_url)))
			.expect("Failed to build provider client for tests.")
	}

	/// Constructs an [`Orchestrator`] backed by an in-memory store and a sandbox channel.
	pub fn build_test_orchestrator(base_url: &str) -> (Orchestrator, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn RecurrenceStore> = store_backend.clone();
		let provider = test_provider_client(base_url);

		(Orchestrator::new(provider, store), store_backend)
	}

	/// Returns a valid creation request fixture for the provided journey.
	pub fn sample_recurrence_request(journey: Journey) -> RecurrenceRequest {
		let amount = Amount::from_str("150.00").expect("Amount fixture should be valid.");

		RecurrenceRequest::builder(
			42,
			journey,
			Debtor {
				tax_id: TaxId::new("12345678909").expect("Tax id fixture should be valid."),
				name: "Maria de Souza".into(),
			},
			"CONTRACT-0042",
		)
		.start_date(time::macros::date!(2025 - 01 - 15))
		.periodicity(Periodicity::Monthly)
		.value(ValueTerms::Fixed(amount))
		.amount(amount)
		.retry_policy(RetryPolicy::ThreeRetriesOverSevenDays)
		.build()
		.expect("Recurrence request fixture should be valid.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use rust_decimal::Decimal;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Date, Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
