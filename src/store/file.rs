//! File-backed [`TokenStore`] that keeps the whole collection in one JSON document.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{UserId, UserRecord},
	store::{StoreError, StoreFuture, StoreStream, TokenStore, snapshot_stream},
};

type Records = BTreeMap<UserId, UserRecord>;

/// Persists user records to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Records>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Opens the store named by a datastore URI; `file://` prefixes are stripped.
	pub fn from_uri(uri: &str) -> Result<Self, StoreError> {
		let path = uri.strip_prefix("file://").unwrap_or(uri);

		if path.is_empty() {
			return Err(StoreError::Backend { message: "Datastore URI has no path".into() });
		}

		Self::open(path)
	}

	/// Location of the backing document.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Records, StoreError> {
		if !path.exists() {
			return Ok(Records::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Records::new());
		}

		let entries: Vec<UserRecord> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().map(|record| (record.user_id.clone(), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Records) -> Result<(), StoreError> {
		let snapshot = contents.values().collect::<Vec<_>>();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn upsert(&self, record: UserRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = guard.insert(record.user_id.clone(), record.clone());

			if let Err(err) = self.persist_locked(&guard) {
				// Keep memory and disk in agreement when the write fails.
				match previous {
					Some(previous) => guard.insert(record.user_id, previous),
					None => guard.remove(&record.user_id),
				};

				return Err(err);
			}

			Ok(())
		})
	}

	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<UserRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(user).cloned()) })
	}

	fn delete<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(removed) = guard.remove(user) else {
				return Ok(false);
			};

			if let Err(err) = self.persist_locked(&guard) {
				guard.insert(user.clone(), removed);

				return Err(err);
			}

			Ok(true)
		})
	}

	fn list_all(&self) -> StoreStream<'_> {
		let inner = self.inner.clone();

		snapshot_stream(move || Ok(inner.read().values().cloned().collect()))
	}
}
