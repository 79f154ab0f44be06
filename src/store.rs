//! Persistence seam for recurrence records.
//!
//! The relational layer of the surrounding application is out of scope here; the orchestrator
//! only needs a narrow contract to file records under and for tests/demos to observe. Database
//! implementations live with the application.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	model::{RecurrenceRecord, RecurrenceStatus},
};

/// Boxed future alias used by [`RecurrenceStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Locally assigned identifier for a stored recurrence record.
pub type RecurrenceId = u64;

/// A persisted record together with its locally assigned identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecurrence {
	/// Local identifier assigned by the store.
	pub id: RecurrenceId,
	/// The persisted record.
	pub record: RecurrenceRecord,
}

/// Storage backend contract implemented by recurrence stores.
pub trait RecurrenceStore
where
	Self: Send + Sync,
{
	/// Persists a new record, assigning it a local identifier.
	fn save(&self, record: RecurrenceRecord) -> StoreFuture<'_, StoredRecurrence>;

	/// Fetches a record by local identifier, if present.
	fn fetch(&self, id: RecurrenceId) -> StoreFuture<'_, Option<StoredRecurrence>>;

	/// Lists all records, newest first.
	fn list(&self) -> StoreFuture<'_, Vec<StoredRecurrence>>;

	/// Applies an externally driven status transition, returning the updated record.
	fn update_status(
		&self,
		id: RecurrenceId,
		status: RecurrenceStatus,
	) -> StoreFuture<'_, Option<StoredRecurrence>>;
}

/// Error type produced by [`RecurrenceStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
