// crates.io
use httpmock::prelude::*;
// self
use pix_recurrence::{
	_preludet::*,
	error::{ProviderError, ValidationError},
	journey::Journey,
	model::RecurrenceStatus,
	store::RecurrenceStore,
};

const TOKEN_BODY: &str =
	"{\"access_token\":\"provider-token\",\"token_type\":\"bearer\",\"expires_in\":1800}";

async fn mock_token(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
}

#[tokio::test]
async fn immediate_charge_journey_round_trips_into_a_pending_record() {
	let server = MockServer::start_async().await;
	let (orchestrator, store) = build_test_orchestrator(&server.base_url());

	mock_token(&server).await;

	let location_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/locrec");
			then.status(201).header("content-type", "application/json").body("{\"id\":11}");
		})
		.await;
	let recurrence_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/rec");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"idRec\":\"RC-1\"}");
		})
		.await;
	let charge_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/cobr/TXNTEST42");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"txid\":\"TXNTEST42\"}");
		})
		.await;
	let code_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/locrec/11");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":11,\"pixCopiaECola\":\"00020126580014br.gov.bcb.pix\"}");
		})
		.await;
	let mut request = sample_recurrence_request(Journey::ImmediateCharge);

	request.transaction_id = Some("TXNTEST42".into());

	let outcome = orchestrator
		.create_recurrence(request)
		.await
		.expect("An immediate-charge journey should complete.");

	assert_eq!(outcome.journey, Journey::ImmediateCharge);
	assert_eq!(outcome.provider_recurrence_id, "RC-1");
	assert_eq!(outcome.location_id, Some(11));
	assert_eq!(outcome.transaction_id.as_deref(), Some("TXNTEST42"));
	assert_eq!(outcome.payment_code.as_deref(), Some("00020126580014br.gov.bcb.pix"));
	assert_eq!(outcome.record.record.status, RecurrenceStatus::PendingApproval);
	assert_eq!(outcome.record.record.provider_recurrence_id, "RC-1");
	assert_eq!(outcome.record.record.amount.to_string(), "150.00");

	location_mock.assert_async().await;
	recurrence_mock.assert_async().await;
	charge_mock.assert_async().await;
	code_mock.assert_async().await;

	let stored = store
		.fetch(outcome.record.id)
		.await
		.expect("Store fetch should succeed.")
		.expect("The record should be persisted.");

	assert_eq!(stored, outcome.record);
}

#[tokio::test]
async fn minimal_authorization_journey_touches_neither_location_nor_charge() {
	let server = MockServer::start_async().await;
	let (orchestrator, store) = build_test_orchestrator(&server.base_url());

	mock_token(&server).await;

	let location_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/locrec");
			then.status(201).header("content-type", "application/json").body("{\"id\":99}");
		})
		.await;
	let recurrence_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/rec");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"idRec\":\"RC-2\"}");
		})
		.await;
	let outcome = orchestrator
		.create_recurrence(sample_recurrence_request(Journey::Authorization))
		.await
		.expect("A minimal authorization journey should complete.");

	assert_eq!(outcome.location_id, None);
	assert_eq!(outcome.payment_code, None);
	assert_eq!(outcome.transaction_id, None);
	assert_eq!(outcome.record.record.location_reference, None);

	location_mock.assert_calls_async(0).await;
	recurrence_mock.assert_calls_async(1).await;

	let records = store.list().await.expect("Store list should succeed.");

	assert_eq!(records.len(), 1);
	assert_eq!(records[0].record.status, RecurrenceStatus::PendingApproval);
}

#[tokio::test]
async fn recurrence_failure_after_location_reports_progress_and_persists_nothing() {
	let server = MockServer::start_async().await;
	let (orchestrator, store) = build_test_orchestrator(&server.base_url());

	mock_token(&server).await;

	let _location_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/locrec");
			then.status(201).header("content-type", "application/json").body("{\"id\":3}");
		})
		.await;
	let _recurrence_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/rec");
			then.status(500).body("internal error");
		})
		.await;
	let err = orchestrator
		.create_recurrence(sample_recurrence_request(Journey::AuthorizationWithCode))
		.await
		.expect_err("A failing mandate step should abort the journey.");

	assert_eq!(err.progress.location_id, Some(3));
	assert_eq!(err.progress.provider_recurrence_id, None);
	assert_eq!(err.progress.payment_code, None);
	assert!(err.source.is_transient());
	assert!(matches!(
		&err.source,
		Error::Provider(ProviderError::Transient { status: Some(500), .. }),
	));

	let records = store.list().await.expect("Store list should succeed.");

	assert!(records.is_empty(), "Nothing may be persisted for a failed journey.");
}

#[tokio::test]
async fn missing_payment_code_aborts_after_the_mandate_steps() {
	let server = MockServer::start_async().await;
	let (orchestrator, store) = build_test_orchestrator(&server.base_url());

	mock_token(&server).await;

	let _location_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/locrec");
			then.status(201).header("content-type", "application/json").body("{\"id\":9}");
		})
		.await;
	let _recurrence_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/rec");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"idRec\":\"RC-9\"}");
		})
		.await;
	let _code_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/locrec/9");
			then.status(200).header("content-type", "application/json").body("{\"id\":9}");
		})
		.await;
	let err = orchestrator
		.create_recurrence(sample_recurrence_request(Journey::AuthorizationWithCode))
		.await
		.expect_err("A location payload without a code should abort the journey.");

	assert!(matches!(err.source, Error::PayloadNotFound(_)));
	assert_eq!(err.progress.location_id, Some(9));
	assert_eq!(err.progress.provider_recurrence_id.as_deref(), Some("RC-9"));
	assert!(store.list().await.expect("Store list should succeed.").is_empty());
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_provider_call() {
	let server = MockServer::start_async().await;
	let (orchestrator, store) = build_test_orchestrator(&server.base_url());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let mut request = sample_recurrence_request(Journey::ImmediateCharge);

	request.contract = String::new();

	let err = orchestrator
		.create_recurrence(request)
		.await
		.expect_err("An empty contract should fail validation.");

	assert!(matches!(err.source, Error::Validation(ValidationError::EmptyContract)));
	assert_eq!(err.progress, Default::default());

	token_mock.assert_calls_async(0).await;

	assert!(store.list().await.expect("Store list should succeed.").is_empty());
}
