//! Journey orchestration: sequencing provider operations and persisting the outcome.
//!
//! The orchestrator walks the step plan of the requested [`Journey`], feeding each provider
//! call with the previous call's output. Nothing is rolled back on a later-step failure—the
//! provider exposes no compensating operation—so aborts return a [`FlowError`] carrying the
//! [`JourneyProgress`] accumulated so far, and no local record is persisted for a failed
//! journey.

// self
use crate::{
	_prelude::*,
	journey::{Journey, Step},
	model::{RecurrenceRecord, RecurrenceRequest, RecurrenceStatus, ValueTerms},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{
		ChargeCalendar, ChargeDebtor, ChargePayload, ChargeValue, MandateBond, MandateCalendar,
		MandatePayload, MandateValue, ProviderClient, WireDebtor,
	},
	store::{RecurrenceStore, StoredRecurrence},
};

const DEFAULT_MANDATE_OBJECT: &str = "Recorrência PIX Automático";
const DEFAULT_CHARGE_INFO: &str = "Cobrança recorrente PIX";
/// Fallback offset applied when a future-dated charge omits its due date.
const DEFAULT_DUE_OFFSET: Duration = Duration::days(30);

/// Provider-side effects that completed before an abort.
///
/// Returned with [`FlowError`] so callers can reconcile a half-created provider mandate by
/// hand; a local record pointing at a failed provider mandate would be worse than no record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JourneyProgress {
	/// Location identifier, when the location step completed.
	pub location_id: Option<i64>,
	/// Provider recurrence identifier, when the mandate step completed.
	pub provider_recurrence_id: Option<String>,
	/// Charge transaction identifier, when the charge step completed.
	pub transaction_id: Option<String>,
	/// Payment code, when the fetch step completed.
	pub payment_code: Option<String>,
}

/// A journey abort: the failing step's error plus everything completed before it.
#[derive(Debug, ThisError)]
#[error("Journey aborted: {source}")]
pub struct FlowError {
	/// Provider-side effects that completed before the abort.
	pub progress: JourneyProgress,
	/// The error that stopped the sequence.
	#[source]
	pub source: Error,
}

/// Successful journey result returned to the surrounding application.
#[derive(Clone, Debug)]
pub struct RecurrenceOutcome {
	/// The persisted record and its local identifier.
	pub record: StoredRecurrence,
	/// Identifier the provider assigned to the mandate.
	pub provider_recurrence_id: String,
	/// Location identifier, for journeys that produced one.
	pub location_id: Option<i64>,
	/// Redeemable payment code, for journeys that produced one.
	pub payment_code: Option<String>,
	/// Charge transaction identifier, for journeys that attached a first charge.
	pub transaction_id: Option<String>,
	/// The journey that ran.
	pub journey: Journey,
}

/// Sequences provider operations according to the requested journey and files the result.
pub struct Orchestrator {
	provider: ProviderClient,
	store: Arc<dyn RecurrenceStore>,
}
impl Orchestrator {
	/// Creates an orchestrator over a provider client and a persistence seam.
	pub fn new(provider: ProviderClient, store: Arc<dyn RecurrenceStore>) -> Self {
		Self { provider, store }
	}

	/// Returns the underlying provider client.
	pub fn provider(&self) -> &ProviderClient {
		&self.provider
	}

	/// Runs one creation request end to end.
	///
	/// Validation happens before any provider call. Steps execute strictly in plan order; the
	/// first failure aborts the sequence and surfaces as a [`FlowError`] with the completed
	/// progress. The persisted record always starts
	/// [`PendingApproval`](RecurrenceStatus::PendingApproval), since debtor approval is
	/// asynchronous and external.
	pub async fn create_recurrence(
		&self,
		request: RecurrenceRequest,
	) -> Result<RecurrenceOutcome, FlowError> {
		const KIND: FlowKind = FlowKind::Journey;

		let span = FlowSpan::new(KIND, request.journey.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run(&request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn run(&self, request: &RecurrenceRequest) -> Result<RecurrenceOutcome, FlowError> {
		let mut progress = JourneyProgress::default();

		request.validate().map_err(|err| abort(&progress, err))?;

		let journey = request.journey;
		let location_id = if journey.includes(Step::CreateLocation) {
			let location =
				self.provider.create_location().await.map_err(|err| abort(&progress, err))?;

			progress.location_id = Some(location.id);

			Some(location.id)
		} else {
			None
		};
		let mandate = mandate_payload(request, location_id);
		let recurrence = self
			.provider
			.create_recurrence(&mandate)
			.await
			.map_err(|err| abort(&progress, err))?;

		progress.provider_recurrence_id = Some(recurrence.id.clone());

		if journey.includes(Step::CreateCharge) {
			let transaction_id =
				request.transaction_id.clone().unwrap_or_else(generate_transaction_id);
			let charge = charge_payload(request, &recurrence.id);

			self.provider
				.create_charge(&transaction_id, &charge)
				.await
				.map_err(|err| abort(&progress, err))?;

			progress.transaction_id = Some(transaction_id);
		}

		let payment_code = match (journey.includes(Step::FetchCode), location_id) {
			(true, Some(id)) => {
				let location =
					self.provider.fetch_location(id).await.map_err(|err| abort(&progress, err))?;

				progress.payment_code = Some(location.payment_code.clone());

				Some(location.payment_code)
			},
			_ => None,
		};
		let record = RecurrenceRecord {
			client_id: request.client_id,
			amount: request.amount,
			frequency: request.periodicity,
			start_date: request.start_date,
			end_date: request.end_date,
			status: RecurrenceStatus::PendingApproval,
			provider_recurrence_id: recurrence.id.clone(),
			location_reference: location_id,
			created_at: OffsetDateTime::now_utc(),
		};
		let stored =
			self.store.save(record).await.map_err(|err| abort(&progress, Error::from(err)))?;

		Ok(RecurrenceOutcome {
			record: stored,
			provider_recurrence_id: recurrence.id,
			location_id,
			payment_code,
			transaction_id: progress.transaction_id.clone(),
			journey,
		})
	}
}
impl Debug for Orchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Orchestrator").field("provider", &self.provider).finish()
	}
}

fn abort(progress: &JourneyProgress, source: impl Into<Error>) -> FlowError {
	FlowError { progress: progress.clone(), source: source.into() }
}

fn mandate_payload(request: &RecurrenceRequest, location_id: Option<i64>) -> MandatePayload {
	let (fixed, minimum) = match request.value {
		ValueTerms::Fixed(amount) => (Some(amount.wire()), None),
		ValueTerms::VariableWithMinimum(amount) => (None, Some(amount.wire())),
	};

	MandatePayload {
		bond: MandateBond {
			contract: request.contract.clone(),
			debtor: WireDebtor {
				tax_id: request.debtor.tax_id.as_ref().to_owned(),
				name: request.debtor.name.clone(),
			},
			object: request
				.description
				.clone()
				.unwrap_or_else(|| DEFAULT_MANDATE_OBJECT.to_owned()),
		},
		calendar: MandateCalendar {
			start_date: request.start_date,
			end_date: request.end_date,
			periodicity: request.periodicity,
		},
		value: MandateValue { fixed, minimum },
		retry_policy: request.retry_policy,
		agreement: request.agreement.clone(),
		location_id,
	}
}

fn charge_payload(request: &RecurrenceRequest, recurrence_id: &str) -> ChargePayload {
	ChargePayload {
		recurrence_id: recurrence_id.to_owned(),
		additional_info: request
			.description
			.clone()
			.unwrap_or_else(|| DEFAULT_CHARGE_INFO.to_owned()),
		calendar: ChargeCalendar { due_date: charge_due_date(request) },
		value: ChargeValue { original: request.amount.wire() },
		debtor: ChargeDebtor::new(
			request.debtor.tax_id.as_ref().to_owned(),
			request.debtor.name.clone(),
			&request.address,
		),
	}
}

fn charge_due_date(request: &RecurrenceRequest) -> Option<Date> {
	match request.journey {
		Journey::ImmediateCharge => Some(request.start_date),
		Journey::ScheduledCharge =>
			Some(request.due_date.unwrap_or_else(|| request.start_date + DEFAULT_DUE_OFFSET)),
		Journey::Authorization | Journey::AuthorizationWithCode => None,
	}
}

/// Generates the conventional `TXN{epoch millis}` transaction id for callers that supplied none.
fn generate_transaction_id() -> String {
	let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

	format!("TXN{millis}")
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::date;
	// self
	use super::*;
	use crate::model::{Amount, Debtor, DebtorAddress, Periodicity, RetryPolicy, TaxId};

	fn request(journey: Journey) -> RecurrenceRequest {
		let amount = Amount::from_str("150.00").expect("Amount fixture should be valid.");

		RecurrenceRequest::builder(
			7,
			journey,
			Debtor {
				tax_id: TaxId::new("12345678909").expect("Tax id fixture should be valid."),
				name: "Maria de Souza".into(),
			},
			"CONTRACT-7",
		)
		.start_date(date!(2025 - 01 - 01))
		.periodicity(Periodicity::Monthly)
		.value(ValueTerms::Fixed(amount))
		.amount(amount)
		.retry_policy(RetryPolicy::NotAllowed)
		.build()
		.expect("Request fixture should be valid.")
	}

	#[test]
	fn scheduled_charges_default_to_thirty_days_after_the_cycle_start() {
		let due = charge_due_date(&request(Journey::ScheduledCharge));

		assert_eq!(due, Some(date!(2025 - 01 - 31)));
	}

	#[test]
	fn scheduled_charges_honor_an_explicit_due_date() {
		let mut request = request(Journey::ScheduledCharge);

		request.due_date = Some(date!(2025 - 03 - 10));

		assert_eq!(charge_due_date(&request), Some(date!(2025 - 03 - 10)));
	}

	#[test]
	fn immediate_charges_fall_due_on_the_cycle_start() {
		assert_eq!(charge_due_date(&request(Journey::ImmediateCharge)), Some(date!(2025 - 01 - 01)));
		assert_eq!(charge_due_date(&request(Journey::Authorization)), None);
	}

	#[test]
	fn generated_transaction_ids_follow_the_txn_convention() {
		let transaction_id = generate_transaction_id();

		assert!(transaction_id.starts_with("TXN"));
		assert!(transaction_id.len() > 3);
		assert!(transaction_id[3..].bytes().all(|byte| byte.is_ascii_digit()));
	}

	#[test]
	fn mandate_payloads_embed_the_location_and_default_the_object() {
		let payload = mandate_payload(&request(Journey::ImmediateCharge), Some(11));

		assert_eq!(payload.location_id, Some(11));
		assert_eq!(payload.bond.object, DEFAULT_MANDATE_OBJECT);
		assert_eq!(payload.value.fixed.as_deref(), Some("150.00"));
		assert_eq!(payload.value.minimum, None);

		let mut varied = request(Journey::Authorization);

		varied.value = ValueTerms::VariableWithMinimum(
			Amount::from_str("9.90").expect("Amount fixture should be valid."),
		);
		varied.description = Some("Assinatura".into());

		let payload = mandate_payload(&varied, None);

		assert_eq!(payload.location_id, None);
		assert_eq!(payload.bond.object, "Assinatura");
		assert_eq!(payload.value.fixed, None);
		assert_eq!(payload.value.minimum.as_deref(), Some("9.90"));
	}

	#[test]
	fn charge_payloads_carry_amount_info_and_address() {
		let mut request = request(Journey::ImmediateCharge);

		request.address = DebtorAddress {
			city: Some("São Paulo".into()),
			state: Some("SP".into()),
			..DebtorAddress::default()
		};

		let payload = charge_payload(&request, "RC-1");

		assert_eq!(payload.recurrence_id, "RC-1");
		assert_eq!(payload.additional_info, DEFAULT_CHARGE_INFO);
		assert_eq!(payload.value.original, "150.00");
		assert_eq!(payload.calendar.due_date, Some(date!(2025 - 01 - 01)));
		assert_eq!(payload.debtor.city.as_deref(), Some("São Paulo"));
		assert_eq!(payload.debtor.state.as_deref(), Some("SP"));
		assert_eq!(payload.debtor.postal_code, None);
	}
}
