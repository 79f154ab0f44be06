// std
use std::str::FromStr;
// crates.io
use time::macros::{date, datetime};
// self
use pix_recurrence::{
	model::{Amount, Periodicity, RecurrenceRecord, RecurrenceStatus},
	store::{MemoryStore, RecurrenceStore},
};

fn record(client_id: i64, provider_id: &str) -> RecurrenceRecord {
	RecurrenceRecord {
		client_id,
		amount: Amount::from_str("99.90").expect("Amount fixture should be valid."),
		frequency: Periodicity::Monthly,
		start_date: date!(2025 - 02 - 01),
		end_date: None,
		status: RecurrenceStatus::PendingApproval,
		provider_recurrence_id: provider_id.into(),
		location_reference: Some(4),
		created_at: datetime!(2025-01-15 09:30 UTC),
	}
}

#[tokio::test]
async fn save_assigns_monotonic_local_ids() {
	let store = MemoryStore::default();
	let first = store.save(record(1, "RC-1")).await.expect("First save should succeed.");
	let second = store.save(record(2, "RC-2")).await.expect("Second save should succeed.");

	assert_eq!(first.id, 1);
	assert_eq!(second.id, 2);

	let fetched = store
		.fetch(first.id)
		.await
		.expect("Fetch should succeed.")
		.expect("The first record should be present.");

	assert_eq!(fetched.record.provider_recurrence_id, "RC-1");
	assert!(store.fetch(999).await.expect("Fetch should succeed.").is_none());
}

#[tokio::test]
async fn list_returns_newest_first() {
	let store = MemoryStore::default();

	store.save(record(1, "RC-1")).await.expect("First save should succeed.");
	store.save(record(2, "RC-2")).await.expect("Second save should succeed.");
	store.save(record(3, "RC-3")).await.expect("Third save should succeed.");

	let records = store.list().await.expect("List should succeed.");
	let provider_ids: Vec<_> =
		records.iter().map(|stored| stored.record.provider_recurrence_id.as_str()).collect();

	assert_eq!(provider_ids, ["RC-3", "RC-2", "RC-1"]);
}

#[tokio::test]
async fn update_status_applies_external_transitions() {
	let store = MemoryStore::default();
	let stored = store.save(record(1, "RC-1")).await.expect("Save should succeed.");
	let updated = store
		.update_status(stored.id, RecurrenceStatus::Active)
		.await
		.expect("Update should succeed.")
		.expect("The record should exist.");

	assert_eq!(updated.record.status, RecurrenceStatus::Active);

	let fetched = store
		.fetch(stored.id)
		.await
		.expect("Fetch should succeed.")
		.expect("The record should still exist.");

	assert_eq!(fetched.record.status, RecurrenceStatus::Active);
	assert!(
		store
			.update_status(999, RecurrenceStatus::Cancelled)
			.await
			.expect("Update should succeed.")
			.is_none(),
	);
}
