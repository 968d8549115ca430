//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{UserId, UserRecord},
	store::{StoreError, StoreFuture, StoreStream, TokenStore, snapshot_stream},
};

type StoreMap = Arc<RwLock<BTreeMap<UserId, UserRecord>>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when no records are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns true when a record exists for `user`.
	pub fn contains(&self, user: &UserId) -> bool {
		self.0.read().contains_key(user)
	}
}
impl TokenStore for MemoryStore {
	fn upsert(&self, record: UserRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(record.user_id.clone(), record);

			Ok(())
		})
	}

	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<UserRecord>> {
		Box::pin(async move { Ok(self.0.read().get(user).cloned()) })
	}

	fn delete<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.write().remove(user).is_some()) })
	}

	fn list_all(&self) -> StoreStream<'_> {
		let map = self.0.clone();

		snapshot_stream(move || Ok::<_, StoreError>(map.read().values().cloned().collect()))
	}
}
