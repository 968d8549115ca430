//! Storage contracts and built-in store implementations for user token records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use futures_util::stream::Stream;
// self
use crate::{
	_prelude::*,
	auth::{UserId, UserRecord},
};

/// Boxed future returned by [`TokenStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;
/// Lazy stream of records returned by [`TokenStore::list_all`].
pub type StoreStream<'a> = Pin<Box<dyn Stream<Item = Result<UserRecord, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by token stores.
///
/// Every mutation is atomic for a single record; concurrent writers to the same key are
/// last-writer-wins.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Creates or replaces the record keyed by `record.user_id`.
	fn upsert(&self, record: UserRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record for `user`, if present.
	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<UserRecord>>;

	/// Deletes the record for `user`, returning whether one existed.
	fn delete<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, bool>;

	/// Streams every record in ascending user id order.
	///
	/// Each call starts a fresh listing; nothing is shared between calls.
	fn list_all(&self) -> StoreStream<'_>;
}

/// Error type produced by [`TokenStore`] implementations.
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

/// Turns a point-in-time copy of the records into a lazy listing.
///
/// The snapshot is taken when the stream is first polled, so a listing created before a
/// mutation still observes it.
pub(crate) fn snapshot_stream<'a, F>(snapshot: F) -> StoreStream<'a>
where
	F: 'a + Send + FnOnce() -> Result<Vec<UserRecord>, StoreError>,
{
	use futures_util::stream::{self, StreamExt};

	Box::pin(
		stream::once(async move { snapshot() })
			.flat_map(|result| match result {
				Ok(records) => stream::iter(records.into_iter().map(Ok).collect::<Vec<_>>()),
				Err(err) => stream::iter(vec![Err(err)]),
			}),
	)
}
