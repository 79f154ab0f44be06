//! Authenticated operations against the provider's recurrence endpoints, plus the wire
//! payload/response types they exchange.
//!
//! Every operation obtains a bearer token from the shared [`TokenClient`], issues exactly one
//! HTTP call over the mutual-TLS [`ProviderChannel`], and maps the response into the error
//! taxonomy: 4xx is permanent, 5xx and transport failures are retryable, and undecodable
//! bodies surface as decode errors carrying the JSON path that failed.

// self
use crate::{
	_prelude::*,
	auth::TokenClient,
	config::{self, ProviderConfig},
	error::{ConfigError, PayloadNotFoundError, ProviderError},
	http::{self, ProviderChannel},
	model::{DebtorAddress, wire_date},
};

/// Name of the header carrying the provider application key.
pub const APPLICATION_KEY_HEADER: &str = "X-Application-Key";
/// Field names searched for the redeemable payment code, in precedence order.
///
/// Older provider API versions expose the code under `location`; newer ones under
/// `pixCopiaECola`. The first present field wins.
pub const PAYMENT_CODE_FIELDS: [&str; 2] = ["pixCopiaECola", "location"];

const PATH_LOCATION: &str = "locrec";
const PATH_RECURRENCE: &str = "rec";
const PATH_CHARGE: &str = "cobr";
const BODY_PREVIEW_LIMIT: usize = 512;

/// Provider operations issued by the client, used as error and telemetry labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// `POST /locrec` creating a mandate location.
	CreateLocation,
	/// `POST /rec` creating the recurrence.
	CreateRecurrence,
	/// `PUT /cobr/{txid}` attaching the first charge.
	CreateCharge,
	/// `GET /locrec/{id}` retrieving the payment-code payload.
	FetchLocation,
}
impl Operation {
	/// Returns a stable label suitable for error messages and telemetry fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::CreateLocation => "create_location",
			Operation::CreateRecurrence => "create_recurrence",
			Operation::CreateCharge => "create_charge",
			Operation::FetchLocation => "fetch_location",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Wire payload for recurrence (mandate) creation.
#[derive(Clone, Debug, Serialize)]
pub struct MandatePayload {
	/// Contract binding between receiver and debtor.
	#[serde(rename = "vinculo")]
	pub bond: MandateBond,
	/// Collection calendar.
	#[serde(rename = "calendario")]
	pub calendar: MandateCalendar,
	/// Value terms.
	#[serde(rename = "valor")]
	pub value: MandateValue,
	/// Retry policy label.
	#[serde(rename = "politicaRetentativa")]
	pub retry_policy: crate::model::RetryPolicy,
	/// Receiver agreement number, when the account uses one.
	#[serde(rename = "convenio", skip_serializing_if = "Option::is_none")]
	pub agreement: Option<String>,
	/// Location identifier embedded when the journey produces a payment code.
	#[serde(rename = "loc", skip_serializing_if = "Option::is_none")]
	pub location_id: Option<i64>,
}

/// Contract/debtor binding inside a mandate payload.
#[derive(Clone, Debug, Serialize)]
pub struct MandateBond {
	/// Contract reference.
	#[serde(rename = "contrato")]
	pub contract: String,
	/// Debtor identity.
	#[serde(rename = "devedor")]
	pub debtor: WireDebtor,
	/// Human-readable mandate object.
	#[serde(rename = "objeto")]
	pub object: String,
}

/// Debtor identity in provider wire form.
#[derive(Clone, Debug, Serialize)]
pub struct WireDebtor {
	/// CPF or CNPJ digits.
	#[serde(rename = "cpfCnpj")]
	pub tax_id: String,
	/// Full legal name.
	#[serde(rename = "nome")]
	pub name: String,
}

/// Collection calendar inside a mandate payload.
#[derive(Clone, Debug, Serialize)]
pub struct MandateCalendar {
	/// First day of the collection cycle.
	#[serde(rename = "dataInicial", with = "wire_date")]
	pub start_date: Date,
	/// Optional last day of the collection cycle.
	#[serde(rename = "dataFinal", with = "wire_date::option", skip_serializing_if = "Option::is_none")]
	pub end_date: Option<Date>,
	/// Cadence label.
	#[serde(rename = "periodicidade")]
	pub periodicity: crate::model::Periodicity,
}

/// Value terms inside a mandate payload; exactly one field is populated.
#[derive(Clone, Debug, Serialize)]
pub struct MandateValue {
	/// Fixed per-cycle amount.
	#[serde(rename = "valorRec", skip_serializing_if = "Option::is_none")]
	pub fixed: Option<String>,
	/// Receiver minimum for variable-value mandates.
	#[serde(rename = "valorMinimoRecebedor", skip_serializing_if = "Option::is_none")]
	pub minimum: Option<String>,
}

/// Wire payload for attaching the first charge to a recurrence.
#[derive(Clone, Debug, Serialize)]
pub struct ChargePayload {
	/// Provider-assigned recurrence identifier.
	#[serde(rename = "idRec")]
	pub recurrence_id: String,
	/// Free-form information shown to the debtor.
	#[serde(rename = "infoAdicional")]
	pub additional_info: String,
	/// Charge calendar; an absent due date means an immediate charge.
	#[serde(rename = "calendario")]
	pub calendar: ChargeCalendar,
	/// Charge value.
	#[serde(rename = "valor")]
	pub value: ChargeValue,
	/// Debtor identity and optional address.
	#[serde(rename = "devedor")]
	pub debtor: ChargeDebtor,
}

/// Charge calendar wire form.
#[derive(Clone, Debug, Serialize)]
pub struct ChargeCalendar {
	/// Due date of the charge.
	#[serde(
		rename = "dataDeVencimento",
		with = "wire_date::option",
		skip_serializing_if = "Option::is_none"
	)]
	pub due_date: Option<Date>,
}

/// Charge value wire form.
#[derive(Clone, Debug, Serialize)]
pub struct ChargeValue {
	/// Original charge amount, e.g. `"150.00"`.
	#[serde(rename = "original")]
	pub original: String,
}

/// Debtor identity and address in charge wire form.
#[derive(Clone, Debug, Serialize)]
pub struct ChargeDebtor {
	/// CPF or CNPJ digits.
	#[serde(rename = "cpfCnpj")]
	pub tax_id: String,
	/// Full legal name.
	#[serde(rename = "nome")]
	pub name: String,
	/// Postal code.
	#[serde(rename = "cep", skip_serializing_if = "Option::is_none")]
	pub postal_code: Option<String>,
	/// City name.
	#[serde(rename = "cidade", skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	/// Contact e-mail.
	#[serde(rename = "email", skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Street and number.
	#[serde(rename = "logradouro", skip_serializing_if = "Option::is_none")]
	pub street: Option<String>,
	/// Two-letter state code.
	#[serde(rename = "uf", skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
}
impl ChargeDebtor {
	/// Builds the wire debtor from identity plus optional address details.
	pub fn new(tax_id: String, name: String, address: &DebtorAddress) -> Self {
		Self {
			tax_id,
			name,
			postal_code: address.postal_code.clone(),
			city: address.city.clone(),
			email: address.email.clone(),
			street: address.street.clone(),
			state: address.state.clone(),
		}
	}
}

/// Response of a successful location creation.
#[derive(Clone, Debug, Deserialize)]
pub struct LocationCreated {
	/// Provider-assigned location identifier.
	pub id: i64,
}

/// Response of a successful recurrence creation.
#[derive(Clone, Debug, Deserialize)]
pub struct RecurrenceCreated {
	/// Provider-assigned recurrence identifier.
	#[serde(rename = "idRec")]
	pub id: String,
}

/// Response of a successful charge attachment.
#[derive(Clone, Debug, Deserialize)]
pub struct ChargeReceipt {
	/// Transaction id echoed by the provider, when present.
	#[serde(rename = "txid", default)]
	pub transaction_id: Option<String>,
}

/// A fetched location with its extracted payment code.
#[derive(Clone, Debug)]
pub struct LocationPayload {
	/// Provider-assigned location identifier.
	pub location_id: i64,
	/// Redeemable payment-code string.
	pub payment_code: String,
	/// Full provider payload for callers that need more than the code.
	pub raw: serde_json::Value,
}

/// Authenticated client for the provider's recurrence endpoints.
#[derive(Clone, Debug)]
pub struct ProviderClient {
	config: Arc<ProviderConfig>,
	channel: ProviderChannel,
	token: TokenClient,
}
impl ProviderClient {
	/// Builds a client and its mutual-TLS channel from the configuration.
	pub fn new(config: Arc<ProviderConfig>) -> Result<Self, ConfigError> {
		let channel = ProviderChannel::build(&config)?;

		Ok(Self::with_channel(config, channel))
	}

	/// Builds a client over an existing channel, sharing the channel with the token acquirer.
	pub fn with_channel(config: Arc<ProviderConfig>, channel: ProviderChannel) -> Self {
		let token = TokenClient::new(config.clone(), channel.clone());

		Self { config, channel, token }
	}

	/// Returns the token acquirer, e.g. to share its credential cache.
	pub fn token_client(&self) -> &TokenClient {
		&self.token
	}

	/// Creates a mandate location (`POST /locrec`, empty body).
	pub async fn create_location(&self) -> Result<LocationCreated> {
		const OPERATION: Operation = Operation::CreateLocation;

		let url = self.endpoint(&[PATH_LOCATION])?;
		let body = self.dispatch(OPERATION, self.channel.post(url)).await?;

		decode(OPERATION, &body)
	}

	/// Creates the recurrence (`POST /rec`) and returns the provider-assigned identifier.
	pub async fn create_recurrence(&self, payload: &MandatePayload) -> Result<RecurrenceCreated> {
		const OPERATION: Operation = Operation::CreateRecurrence;

		let url = self.endpoint(&[PATH_RECURRENCE])?;
		let body = self.dispatch(OPERATION, self.channel.post(url).json(payload)).await?;

		decode(OPERATION, &body)
	}

	/// Attaches the first charge (`PUT /cobr/{txid}`), keyed by the caller's transaction id.
	pub async fn create_charge(
		&self,
		transaction_id: &str,
		payload: &ChargePayload,
	) -> Result<ChargeReceipt> {
		const OPERATION: Operation = Operation::CreateCharge;

		let url = self.endpoint(&[PATH_CHARGE, transaction_id])?;
		let body = self.dispatch(OPERATION, self.channel.put(url).json(payload)).await?;

		decode(OPERATION, &body)
	}

	/// Retrieves a location (`GET /locrec/{id}`) and extracts its payment code.
	pub async fn fetch_location(&self, location_id: i64) -> Result<LocationPayload> {
		const OPERATION: Operation = Operation::FetchLocation;

		let url = self.endpoint(&[PATH_LOCATION, &location_id.to_string()])?;
		let body = self.dispatch(OPERATION, self.channel.get(url)).await?;
		let raw: serde_json::Value = decode(OPERATION, &body)?;
		let payment_code = extract_payment_code(&raw)
			.ok_or(PayloadNotFoundError { location_id, fields: &PAYMENT_CODE_FIELDS })?
			.to_owned();

		Ok(LocationPayload { location_id, payment_code, raw })
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigError> {
		config::join_segments(&self.config.base_url, segments)
	}

	async fn dispatch(
		&self,
		operation: Operation,
		request: reqwest::RequestBuilder,
	) -> Result<Vec<u8>> {
		let token = self.token.valid_token().await?;
		let response = request
			.bearer_auth(token.expose())
			.header(APPLICATION_KEY_HEADER, self.config.application_key.as_str())
			.send()
			.await
			.map_err(|source| transport_failure(operation, source))?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers());
		let bytes = response
			.bytes()
			.await
			.map_err(|source| transport_failure(operation, source))?;

		if status.is_success() {
			Ok(bytes.to_vec())
		} else if status.is_server_error() {
			Err(ProviderError::Transient {
				operation,
				status: Some(status.as_u16()),
				message: body_preview(&bytes),
				retry_after,
			}
			.into())
		} else {
			Err(ProviderError::Permanent {
				operation,
				status: status.as_u16(),
				body: body_preview(&bytes),
			}
			.into())
		}
	}
}

fn transport_failure(operation: Operation, source: ReqwestError) -> Error {
	ProviderError::Transient {
		operation,
		status: source.status().map(|status| status.as_u16()),
		message: source.to_string(),
		retry_after: None,
	}
	.into()
}

fn decode<T>(operation: Operation, bytes: &[u8]) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ProviderError::ResponseDecode { operation, source }.into())
}

fn extract_payment_code(payload: &serde_json::Value) -> Option<&str> {
	PAYMENT_CODE_FIELDS
		.iter()
		.find_map(|field| payload.get(field).and_then(serde_json::Value::as_str))
}

fn body_preview(bytes: &[u8]) -> String {
	let text = String::from_utf8_lossy(bytes);
	let mut preview = text.trim().to_owned();

	if preview.len() > BODY_PREVIEW_LIMIT {
		let cut = (0..=BODY_PREVIEW_LIMIT).rev().find(|index| preview.is_char_boundary(*index));

		preview.truncate(cut.unwrap_or(0));
		preview.push('…');
	}

	preview
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::date;
	// self
	use super::*;
	use crate::model::{Periodicity, RetryPolicy};

	#[test]
	fn mandate_payload_serializes_provider_field_names() {
		let payload = MandatePayload {
			bond: MandateBond {
				contract: "CONTRACT-7".into(),
				debtor: WireDebtor { tax_id: "12345678909".into(), name: "Maria".into() },
				object: "Assinatura mensal".into(),
			},
			calendar: MandateCalendar {
				start_date: date!(2025 - 01 - 15),
				end_date: None,
				periodicity: Periodicity::Monthly,
			},
			value: MandateValue { fixed: Some("150.00".into()), minimum: None },
			retry_policy: RetryPolicy::ThreeRetriesOverSevenDays,
			agreement: None,
			location_id: Some(11),
		};
		let rendered =
			serde_json::to_value(&payload).expect("Mandate payload should serialize successfully.");

		assert_eq!(
			rendered,
			json!({
				"vinculo": {
					"contrato": "CONTRACT-7",
					"devedor": { "cpfCnpj": "12345678909", "nome": "Maria" },
					"objeto": "Assinatura mensal",
				},
				"calendario": { "dataInicial": "2025-01-15", "periodicidade": "MENSAL" },
				"valor": { "valorRec": "150.00" },
				"politicaRetentativa": "PERMITE_3R_7D",
				"loc": 11,
			}),
		);
	}

	#[test]
	fn charge_payload_serializes_due_date_and_address() {
		let payload = ChargePayload {
			recurrence_id: "RC-1".into(),
			additional_info: "Cobrança recorrente PIX".into(),
			calendar: ChargeCalendar { due_date: Some(date!(2025 - 01 - 31)) },
			value: ChargeValue { original: "150.00".into() },
			debtor: ChargeDebtor {
				tax_id: "12345678909".into(),
				name: "Maria".into(),
				postal_code: Some("01310-100".into()),
				city: Some("São Paulo".into()),
				email: None,
				street: None,
				state: Some("SP".into()),
			},
		};
		let rendered =
			serde_json::to_value(&payload).expect("Charge payload should serialize successfully.");

		assert_eq!(rendered["idRec"], "RC-1");
		assert_eq!(rendered["calendario"]["dataDeVencimento"], "2025-01-31");
		assert_eq!(rendered["valor"]["original"], "150.00");
		assert_eq!(rendered["devedor"]["cep"], "01310-100");
		assert_eq!(rendered["devedor"]["uf"], "SP");
		assert!(rendered["devedor"].get("email").is_none());
	}

	#[test]
	fn payment_code_extraction_prefers_the_newer_field() {
		let both = json!({ "pixCopiaECola": "code-new", "location": "code-old" });
		let legacy = json!({ "location": "code-old" });
		let neither = json!({ "id": 5 });

		assert_eq!(extract_payment_code(&both), Some("code-new"));
		assert_eq!(extract_payment_code(&legacy), Some("code-old"));
		assert_eq!(extract_payment_code(&neither), None);
	}

	#[test]
	fn body_previews_truncate_on_char_boundaries() {
		let short = body_preview(b"  {\"error\":\"oops\"} ");

		assert_eq!(short, "{\"error\":\"oops\"}");

		let long = body_preview("á".repeat(600).as_bytes());

		assert!(long.ends_with('…'));
		assert!(long.len() <= BODY_PREVIEW_LIMIT + '…'.len_utf8());
	}

	#[test]
	fn decode_reports_the_failing_json_path() {
		let err = decode::<RecurrenceCreated>(Operation::CreateRecurrence, b"{\"idRec\":7}")
			.expect_err("A numeric idRec should fail to decode.");

		assert!(matches!(
			err,
			Error::Provider(ProviderError::ResponseDecode {
				operation: Operation::CreateRecurrence,
				..
			}),
		));
	}
}
