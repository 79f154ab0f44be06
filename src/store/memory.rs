//! Thread-safe in-memory [`RecurrenceStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	model::{RecurrenceRecord, RecurrenceStatus},
	store::{RecurrenceId, RecurrenceStore, StoreError, StoreFuture, StoredRecurrence},
};

type StoreState = Arc<RwLock<MemoryInner>>;

#[derive(Debug, Default)]
struct MemoryInner {
	next_id: RecurrenceId,
	records: BTreeMap<RecurrenceId, StoredRecurrence>,
}

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreState);
impl MemoryStore {
	fn save_now(state: StoreState, record: RecurrenceRecord) -> Result<StoredRecurrence, StoreError> {
		let mut guard = state.write();

		guard.next_id += 1;

		let stored = StoredRecurrence { id: guard.next_id, record };

		guard.records.insert(stored.id, stored.clone());

		Ok(stored)
	}

	fn fetch_now(state: StoreState, id: RecurrenceId) -> Option<StoredRecurrence> {
		state.read().records.get(&id).cloned()
	}

	fn list_now(state: StoreState) -> Vec<StoredRecurrence> {
		state.read().records.values().rev().cloned().collect()
	}

	fn update_now(
		state: StoreState,
		id: RecurrenceId,
		status: RecurrenceStatus,
	) -> Option<StoredRecurrence> {
		let mut guard = state.write();

		guard.records.get_mut(&id).map(|stored| {
			stored.record.status = status;

			stored.clone()
		})
	}
}
impl RecurrenceStore for MemoryStore {
	fn save(&self, record: RecurrenceRecord) -> StoreFuture<'_, StoredRecurrence> {
		let state = self.0.clone();

		Box::pin(async move { Self::save_now(state, record) })
	}

	fn fetch(&self, id: RecurrenceId) -> StoreFuture<'_, Option<StoredRecurrence>> {
		let state = self.0.clone();

		Box::pin(async move { Ok(Self::fetch_now(state, id)) })
	}

	fn list(&self) -> StoreFuture<'_, Vec<StoredRecurrence>> {
		let state = self.0.clone();

		Box::pin(async move { Ok(Self::list_now(state)) })
	}

	fn update_status(
		&self,
		id: RecurrenceId,
		status: RecurrenceStatus,
	) -> StoreFuture<'_, Option<StoredRecurrence>> {
		let state = self.0.clone();

		Box::pin(async move { Ok(Self::update_now(state, id, status)) })
	}
}
