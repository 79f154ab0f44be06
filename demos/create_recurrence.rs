//! Demonstrates running an immediate-charge journey end to end against a mock provider,
//! printing the persisted record and the redeemable payment code.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use pix_recurrence::{
	config::ProviderConfig,
	flows::Orchestrator,
	journey::Journey,
	model::{Amount, Debtor, Periodicity, RecurrenceRequest, RetryPolicy, TaxId, ValueTerms},
	provider::ProviderClient,
	store::{MemoryStore, RecurrenceStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/locrec");
			then.status(201).header("content-type", "application/json").body("{\"id\":11}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/rec");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"idRec\":\"RC-DEMO-1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path("/cobr/TXNDEMO1");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"txid\":\"TXNDEMO1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/locrec/11");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":11,\"pixCopiaECola\":\"00020126580014br.gov.bcb.pix-demo\"}");
		})
		.await;

	// Sandbox posture: the mock server presents a self-signed certificate and no client
	// identity is enrolled. Production deployments keep both flags at their defaults.
	let config = ProviderConfig::builder(
		Url::parse(&server.base_url())?,
		"demo-application-key",
		"demo-client",
		"demo-secret",
	)
	.verify_server(false)
	.require_client_identity(false)
	.build()?;
	let provider = ProviderClient::new(Arc::new(config))?;
	let store: Arc<dyn RecurrenceStore> = Arc::new(MemoryStore::default());
	let orchestrator = Orchestrator::new(provider, store.clone());
	let amount: Amount = "150.00".parse()?;
	let request = RecurrenceRequest::builder(
		42,
		Journey::ImmediateCharge,
		Debtor { tax_id: TaxId::new("12345678909")?, name: "Maria de Souza".into() },
		"CONTRACT-0042",
	)
	.start_date(time::macros::date!(2025 - 01 - 15))
	.periodicity(Periodicity::Monthly)
	.value(ValueTerms::Fixed(amount))
	.amount(amount)
	.retry_policy(RetryPolicy::ThreeRetriesOverSevenDays)
	.transaction_id("TXNDEMO1")
	.build()?;
	let outcome = orchestrator.create_recurrence(request).await?;

	println!("Persisted recurrence #{} with status {}.", outcome.record.id, outcome.record.record.status);
	println!("Provider mandate id: {}.", outcome.provider_recurrence_id);

	if let Some(code) = &outcome.payment_code {
		println!("Payment code: {code}.");
	}

	Ok(())
}
