//! Journey variants and their provider step sequences.
//!
//! A journey is one of the provider-defined workflow variants for establishing a
//! recurring-payment mandate. Each variant maps to a fixed, ordered step plan through
//! [`Journey::steps`]; the orchestrator consults the plan instead of re-deriving the branching,
//! so the sequence stays a single, table-testable contract.

// self
use crate::_prelude::*;

/// Provider-defined workflow variants for establishing a recurring-payment mandate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Journey {
	/// Mandate authorization only; the debtor approves through their own banking channel.
	Authorization,
	/// Mandate authorization delivered through a scannable payment code, without a first charge.
	AuthorizationWithCode,
	/// Mandate authorization plus an immediate first charge dated to the cycle start.
	ImmediateCharge,
	/// Mandate authorization plus a future-dated first charge.
	ScheduledCharge,
}
impl Journey {
	/// Returns the ordered provider step plan for this variant.
	pub const fn steps(self) -> &'static [Step] {
		match self {
			Journey::Authorization => &[Step::CreateRecurrence, Step::Persist],
			Journey::AuthorizationWithCode =>
				&[Step::CreateLocation, Step::CreateRecurrence, Step::FetchCode, Step::Persist],
			Journey::ImmediateCharge | Journey::ScheduledCharge => &[
				Step::CreateLocation,
				Step::CreateRecurrence,
				Step::CreateCharge,
				Step::FetchCode,
				Step::Persist,
			],
		}
	}

	/// Returns `true` when the plan contains the provided step.
	pub fn includes(self, step: Step) -> bool {
		self.steps().contains(&step)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Journey::Authorization => "authorization",
			Journey::AuthorizationWithCode => "authorization_with_code",
			Journey::ImmediateCharge => "immediate_charge",
			Journey::ScheduledCharge => "scheduled_charge",
		}
	}
}
impl Display for Journey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One provider-facing step in a journey plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
	/// Create the mandate location that later yields the payment code.
	CreateLocation,
	/// Create the recurrence (mandate) itself.
	CreateRecurrence,
	/// Attach the first charge to the recurrence.
	CreateCharge,
	/// Retrieve the redeemable payment code from the location.
	FetchCode,
	/// Persist the local record.
	Persist,
}
impl Step {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Step::CreateLocation => "create_location",
			Step::CreateRecurrence => "create_recurrence",
			Step::CreateCharge => "create_charge",
			Step::FetchCode => "fetch_code",
			Step::Persist => "persist",
		}
	}
}
impl Display for Step {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
