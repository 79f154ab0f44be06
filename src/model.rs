//! Caller-facing domain model: money, calendar terms, debtor identity, creation requests, and
//! persisted records.

// self
use crate::{_prelude::*, error::ValidationError, journey::Journey};

pub(crate) mod wire_date {
	//! Serde helpers for the provider's `AAAA-MM-DD` calendar dates.

	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

	const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

	pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let rendered = date.format(FORMAT).map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&rendered)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Date::parse(&raw, FORMAT).map_err(serde::de::Error::custom)
	}

	pub mod option {
		//! Variant of [`wire_date`](super) for optional dates.

		use super::*;

		pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match date {
				Some(date) => super::serialize(date, serializer),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Option::<String>::deserialize(deserializer)?
				.map(|raw| Date::parse(&raw, FORMAT).map_err(serde::de::Error::custom))
				.transpose()
		}
	}
}

/// Monetary amount normalized to two decimal places, matching the provider wire format
/// (`"150.00"`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);
impl Amount {
	/// Validates and normalizes a decimal value into an amount.
	pub fn new(value: Decimal) -> Result<Self, ValidationError> {
		if value <= Decimal::ZERO {
			return Err(ValidationError::NonPositiveAmount { value });
		}
		if value.scale() > 2 {
			return Err(ValidationError::FractionalCents { value });
		}

		let mut normalized = value;

		normalized.rescale(2);

		Ok(Self(normalized))
	}

	/// Returns the normalized decimal value.
	pub fn value(&self) -> Decimal {
		self.0
	}

	/// Renders the provider wire representation, e.g. `"150.00"`.
	pub(crate) fn wire(&self) -> String {
		self.0.to_string()
	}
}
impl TryFrom<Decimal> for Amount {
	type Error = ValidationError;

	fn try_from(value: Decimal) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<Amount> for Decimal {
	fn from(amount: Amount) -> Self {
		amount.0
	}
}
impl FromStr for Amount {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = s.parse::<Decimal>().map_err(|_| ValidationError::UnparsableAmount)?;

		Self::new(value)
	}
}
impl Debug for Amount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Amount({})", self.0)
	}
}
impl Display for Amount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}

/// Debtor tax identifier: an 11-digit CPF or a 14-digit CNPJ, digits only.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);
impl TaxId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
		let view = value.as_ref();

		if !matches!(view.len(), 11 | 14) || !view.bytes().all(|byte| byte.is_ascii_digit()) {
			return Err(ValidationError::InvalidTaxId);
		}

		Ok(Self(view.to_owned()))
	}

	/// Returns `true` for company identifiers (CNPJ).
	pub fn is_company(&self) -> bool {
		self.0.len() == 14
	}
}
impl AsRef<str> for TaxId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<TaxId> for String {
	fn from(value: TaxId) -> Self {
		value.0
	}
}
impl TryFrom<String> for TaxId {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Display for TaxId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl Debug for TaxId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// Keep full identifiers out of logs; the trailing digits are enough to correlate.
		write!(f, "TaxId(***{})", &self.0[self.0.len() - 2..])
	}
}

/// Mandate billing cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Periodicity {
	/// One collection per week.
	#[serde(rename = "SEMANAL")]
	Weekly,
	/// One collection per month.
	#[serde(rename = "MENSAL")]
	Monthly,
	/// One collection per quarter.
	#[serde(rename = "TRIMESTRAL")]
	Quarterly,
	/// One collection per semester.
	#[serde(rename = "SEMESTRAL")]
	Semiannual,
	/// One collection per year.
	#[serde(rename = "ANUAL")]
	Annual,
}
impl Periodicity {
	/// Returns the provider wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Periodicity::Weekly => "SEMANAL",
			Periodicity::Monthly => "MENSAL",
			Periodicity::Quarterly => "TRIMESTRAL",
			Periodicity::Semiannual => "SEMESTRAL",
			Periodicity::Annual => "ANUAL",
		}
	}
}
impl Display for Periodicity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Provider retry policy applied to failed collection attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
	/// Failed collections are not retried.
	#[serde(rename = "NAO_PERMITE")]
	NotAllowed,
	/// Up to three retries within seven days of the original due date.
	#[serde(rename = "PERMITE_3R_7D")]
	ThreeRetriesOverSevenDays,
}

/// Lifecycle status of a persisted recurrence.
///
/// Creation always starts at [`PendingApproval`](RecurrenceStatus::PendingApproval); later
/// transitions are driven externally by provider webhooks and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceStatus {
	/// Awaiting debtor approval at the provider.
	PendingApproval,
	/// Approved and collecting.
	Active,
	/// Collection temporarily suspended.
	Paused,
	/// Terminated by either party.
	Cancelled,
	/// Reached its end date.
	Expired,
}
impl RecurrenceStatus {
	/// Returns the wire label used by the surrounding application.
	pub const fn as_str(self) -> &'static str {
		match self {
			RecurrenceStatus::PendingApproval => "PENDING_APPROVAL",
			RecurrenceStatus::Active => "ACTIVE",
			RecurrenceStatus::Paused => "PAUSED",
			RecurrenceStatus::Cancelled => "CANCELLED",
			RecurrenceStatus::Expired => "EXPIRED",
		}
	}
}
impl Display for RecurrenceStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Value terms of the mandate: either every cycle debits a fixed amount, or cycles debit
/// variable amounts that never fall below a receiver minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTerms {
	/// Every cycle debits exactly this amount.
	Fixed(Amount),
	/// Cycles debit variable amounts, never below this minimum.
	VariableWithMinimum(Amount),
}

/// Debtor identity attached to the mandate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
	/// CPF or CNPJ of the debtor.
	pub tax_id: TaxId,
	/// Full legal name.
	pub name: String,
}

/// Optional debtor address details forwarded into the first-charge payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtorAddress {
	/// Street and number.
	pub street: Option<String>,
	/// City name.
	pub city: Option<String>,
	/// Two-letter state code.
	pub state: Option<String>,
	/// Postal code (CEP).
	pub postal_code: Option<String>,
	/// Contact e-mail.
	pub email: Option<String>,
}

/// Caller-supplied aggregate describing one recurrence to create. Immutable once submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRequest {
	/// Local client (customer) identifier the record is filed under.
	pub client_id: i64,
	/// Selected journey variant.
	pub journey: Journey,
	/// Debtor identity.
	pub debtor: Debtor,
	/// Optional debtor address forwarded into charge payloads.
	#[serde(default)]
	pub address: DebtorAddress,
	/// Contract reference binding the mandate.
	pub contract: String,
	/// Mandate object/description; defaults provider-side wording when absent.
	pub description: Option<String>,
	/// Receiver agreement number ("convenio"), when the provider account uses one.
	pub agreement: Option<String>,
	/// First day of the collection cycle.
	#[serde(with = "wire_date")]
	pub start_date: Date,
	/// Optional last day of the collection cycle.
	#[serde(default, with = "wire_date::option")]
	pub end_date: Option<Date>,
	/// Billing cadence.
	pub periodicity: Periodicity,
	/// Mandate value terms.
	pub value: ValueTerms,
	/// First-charge amount, also recorded on the persisted record.
	pub amount: Amount,
	/// Provider retry policy.
	pub retry_policy: RetryPolicy,
	/// Caller-chosen charge transaction id; generated when absent.
	pub transaction_id: Option<String>,
	/// Due date for future-dated first charges; defaults to 30 days after the cycle start.
	#[serde(default, with = "wire_date::option")]
	pub due_date: Option<Date>,
}
impl RecurrenceRequest {
	/// Returns a builder seeded with the required identity of the request.
	pub fn builder(
		client_id: i64,
		journey: Journey,
		debtor: Debtor,
		contract: impl Into<String>,
	) -> RecurrenceRequestBuilder {
		RecurrenceRequestBuilder::new(client_id, journey, debtor, contract)
	}

	/// Validates cross-field invariants. Runs before any provider call is issued.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.contract.trim().is_empty() {
			return Err(ValidationError::EmptyContract);
		}
		if self.debtor.name.trim().is_empty() {
			return Err(ValidationError::EmptyDebtorName);
		}
		if let Some(end) = self.end_date
			&& end <= self.start_date
		{
			return Err(ValidationError::EndBeforeStart { start: self.start_date, end });
		}
		if let Some(due) = self.due_date
			&& due <= self.start_date
		{
			return Err(ValidationError::DueBeforeStart { start: self.start_date, due });
		}
		if let Some(transaction_id) = &self.transaction_id
			&& (transaction_id.is_empty()
				|| transaction_id.len() > 35
				|| !transaction_id.bytes().all(|byte| byte.is_ascii_alphanumeric()))
		{
			return Err(ValidationError::InvalidTransactionId);
		}

		Ok(())
	}
}

/// Builder for [`RecurrenceRequest`] values.
#[derive(Debug)]
pub struct RecurrenceRequestBuilder {
	client_id: i64,
	journey: Journey,
	debtor: Debtor,
	contract: String,
	address: DebtorAddress,
	description: Option<String>,
	agreement: Option<String>,
	start_date: Option<Date>,
	end_date: Option<Date>,
	periodicity: Option<Periodicity>,
	value: Option<ValueTerms>,
	amount: Option<Amount>,
	retry_policy: Option<RetryPolicy>,
	transaction_id: Option<String>,
	due_date: Option<Date>,
}
impl RecurrenceRequestBuilder {
	fn new(client_id: i64, journey: Journey, debtor: Debtor, contract: impl Into<String>) -> Self {
		Self {
			client_id,
			journey,
			debtor,
			contract: contract.into(),
			address: DebtorAddress::default(),
			description: None,
			agreement: None,
			start_date: None,
			end_date: None,
			periodicity: None,
			value: None,
			amount: None,
			retry_policy: None,
			transaction_id: None,
			due_date: None,
		}
	}

	/// Sets the first day of the collection cycle.
	pub fn start_date(mut self, date: Date) -> Self {
		self.start_date = Some(date);

		self
	}

	/// Sets the last day of the collection cycle.
	pub fn end_date(mut self, date: Date) -> Self {
		self.end_date = Some(date);

		self
	}

	/// Sets the billing cadence.
	pub fn periodicity(mut self, periodicity: Periodicity) -> Self {
		self.periodicity = Some(periodicity);

		self
	}

	/// Sets the mandate value terms.
	pub fn value(mut self, value: ValueTerms) -> Self {
		self.value = Some(value);

		self
	}

	/// Sets the first-charge amount.
	pub fn amount(mut self, amount: Amount) -> Self {
		self.amount = Some(amount);

		self
	}

	/// Sets the provider retry policy.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = Some(policy);

		self
	}

	/// Sets the mandate object/description.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Sets the receiver agreement number.
	pub fn agreement(mut self, agreement: impl Into<String>) -> Self {
		self.agreement = Some(agreement.into());

		self
	}

	/// Sets the debtor address forwarded into charge payloads.
	pub fn address(mut self, address: DebtorAddress) -> Self {
		self.address = address;

		self
	}

	/// Sets a caller-chosen charge transaction id.
	pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
		self.transaction_id = Some(transaction_id.into());

		self
	}

	/// Sets the due date for future-dated first charges.
	pub fn due_date(mut self, date: Date) -> Self {
		self.due_date = Some(date);

		self
	}

	/// Consumes the builder and validates the resulting request.
	pub fn build(self) -> Result<RecurrenceRequest, ValidationError> {
		let request = RecurrenceRequest {
			client_id: self.client_id,
			journey: self.journey,
			debtor: self.debtor,
			address: self.address,
			contract: self.contract,
			description: self.description,
			agreement: self.agreement,
			start_date: self.start_date.ok_or(ValidationError::MissingStartDate)?,
			end_date: self.end_date,
			periodicity: self.periodicity.ok_or(ValidationError::MissingPeriodicity)?,
			value: self.value.ok_or(ValidationError::MissingValueTerms)?,
			amount: self.amount.ok_or(ValidationError::MissingAmount)?,
			retry_policy: self.retry_policy.ok_or(ValidationError::MissingRetryPolicy)?,
			transaction_id: self.transaction_id,
			due_date: self.due_date,
		};

		request.validate()?;

		Ok(request)
	}
}

/// Persisted result of a successful journey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRecord {
	/// Local client (customer) identifier.
	pub client_id: i64,
	/// First-charge amount.
	pub amount: Amount,
	/// Billing cadence.
	pub frequency: Periodicity,
	/// First day of the collection cycle.
	#[serde(with = "wire_date")]
	pub start_date: Date,
	/// Optional last day of the collection cycle.
	#[serde(default, with = "wire_date::option")]
	pub end_date: Option<Date>,
	/// Lifecycle status; always starts pending approval.
	pub status: RecurrenceStatus,
	/// Identifier the provider assigned to the mandate.
	pub provider_recurrence_id: String,
	/// Location identifier when the journey produced a scannable code.
	pub location_reference: Option<i64>,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::date;
	// self
	use super::*;

	fn debtor() -> Debtor {
		Debtor {
			tax_id: TaxId::new("12345678909").expect("Tax id fixture should be valid."),
			name: "Maria de Souza".into(),
		}
	}

	fn builder() -> RecurrenceRequestBuilder {
		let amount = Amount::from_str("150.00").expect("Amount fixture should be valid.");

		RecurrenceRequest::builder(7, Journey::ImmediateCharge, debtor(), "CONTRACT-7")
			.start_date(date!(2025 - 01 - 15))
			.periodicity(Periodicity::Monthly)
			.value(ValueTerms::Fixed(amount))
			.amount(amount)
			.retry_policy(RetryPolicy::NotAllowed)
	}

	#[test]
	fn amounts_normalize_to_two_decimal_places() {
		let amount = Amount::from_str("150.5").expect("One decimal place should be accepted.");

		assert_eq!(amount.wire(), "150.50");
		assert_eq!(
			Amount::from_str("150").expect("Whole amounts should be accepted.").wire(),
			"150.00",
		);
	}

	#[test]
	fn amounts_reject_non_positive_and_sub_cent_values() {
		assert!(matches!(Amount::from_str("0"), Err(ValidationError::NonPositiveAmount { .. })));
		assert!(matches!(
			Amount::from_str("-3.10"),
			Err(ValidationError::NonPositiveAmount { .. })
		));
		assert!(matches!(
			Amount::from_str("10.999"),
			Err(ValidationError::FractionalCents { .. })
		));
		assert!(matches!(Amount::from_str("abc"), Err(ValidationError::UnparsableAmount)));
	}

	#[test]
	fn tax_ids_accept_cpf_and_cnpj_lengths_only() {
		assert!(TaxId::new("12345678909").is_ok());

		let cnpj = TaxId::new("12345678000195").expect("CNPJ fixture should be valid.");

		assert!(cnpj.is_company());
		assert!(TaxId::new("123").is_err());
		assert!(TaxId::new("1234567890a").is_err());
	}

	#[test]
	fn tax_id_debug_masks_leading_digits() {
		let tax_id = TaxId::new("12345678909").expect("Tax id fixture should be valid.");

		assert_eq!(format!("{tax_id:?}"), "TaxId(***09)");
	}

	#[test]
	fn builder_requires_calendar_and_value_fields() {
		let err = RecurrenceRequest::builder(7, Journey::Authorization, debtor(), "CONTRACT-7")
			.build()
			.expect_err("Missing start date should be rejected.");

		assert_eq!(err, ValidationError::MissingStartDate);
	}

	#[test]
	fn validate_rejects_inverted_calendars() {
		let err = builder()
			.end_date(date!(2025 - 01 - 01))
			.build()
			.expect_err("End dates before the cycle start should be rejected.");

		assert!(matches!(err, ValidationError::EndBeforeStart { .. }));

		let err = builder()
			.due_date(date!(2025 - 01 - 10))
			.build()
			.expect_err("Due dates before the cycle start should be rejected.");

		assert!(matches!(err, ValidationError::DueBeforeStart { .. }));
	}

	#[test]
	fn validate_rejects_malformed_transaction_ids() {
		let err = builder()
			.transaction_id("has spaces")
			.build()
			.expect_err("Transaction ids with whitespace should be rejected.");

		assert_eq!(err, ValidationError::InvalidTransactionId);

		let err = builder()
			.transaction_id("a".repeat(36))
			.build()
			.expect_err("Oversized transaction ids should be rejected.");

		assert_eq!(err, ValidationError::InvalidTransactionId);
		assert!(builder().transaction_id("TXN1736899200000").build().is_ok());
	}

	#[test]
	fn wire_dates_round_trip() {
		let request = builder().build().expect("Request fixture should be valid.");
		let rendered =
			serde_json::to_value(&request).expect("Request should serialize successfully.");

		assert_eq!(rendered["start_date"], "2025-01-15");
		assert_eq!(rendered["periodicity"], "MENSAL");
		assert_eq!(rendered["retry_policy"], "NAO_PERMITE");
		assert_eq!(rendered["amount"], "150.00");

		let decoded: RecurrenceRequest =
			serde_json::from_value(rendered).expect("Request should deserialize successfully.");

		assert_eq!(decoded, request);
	}

	#[test]
	fn status_labels_match_the_application_wire_format() {
		assert_eq!(RecurrenceStatus::PendingApproval.as_str(), "PENDING_APPROVAL");
		assert_eq!(
			serde_json::to_value(RecurrenceStatus::PendingApproval)
				.expect("Status should serialize successfully."),
			"PENDING_APPROVAL",
		);
	}
}
