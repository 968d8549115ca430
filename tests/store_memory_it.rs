mod common;

// crates.io
use color_eyre::{Result, eyre::eyre};
use futures_util::TryStreamExt;
// self
use common::*;

async fn listed_ids(store: &MemoryStore) -> Result<Vec<String>> {
	Ok(store.list_all().map_ok(|record| record.user_id.to_string()).try_collect::<Vec<_>>().await?)
}

#[tokio::test]
async fn upsert_replaces_by_user_id() -> Result<()> {
	let store = MemoryStore::default();

	seed(&store, "100").await;

	let replacement = UserRecord::new(user("100"), "renamed", "access-b", "refresh-b");

	store.upsert(replacement).await?;

	let stored = store.get(&user("100")).await?.ok_or_else(|| eyre!("record 100 is missing"))?;

	assert_eq!(store.len(), 1);
	assert_eq!(stored.username, "renamed");
	assert_eq!(stored.refresh_token.expose(), "refresh-b");

	Ok(())
}

#[tokio::test]
async fn delete_is_idempotent() -> Result<()> {
	let store = MemoryStore::default();

	seed(&store, "100").await;

	assert!(store.delete(&user("100")).await?);
	assert!(!store.delete(&user("100")).await?);
	assert!(store.get(&user("100")).await?.is_none());

	Ok(())
}

#[tokio::test]
async fn listing_is_ordered_and_restartable() -> Result<()> {
	let store = MemoryStore::default();

	for id in ["300", "100", "200"] {
		seed(&store, id).await;
	}

	assert_eq!(listed_ids(&store).await?, ["100", "200", "300"]);
	assert_eq!(listed_ids(&store).await?, ["100", "200", "300"]);
	assert!(listed_ids(&MemoryStore::default()).await?.is_empty());

	Ok(())
}

#[tokio::test]
async fn listing_snapshot_is_taken_on_first_poll() -> Result<()> {
	let store = MemoryStore::default();

	seed(&store, "100").await;

	let listing = store.list_all();

	seed(&store, "200").await;

	let ids = listing.map_ok(|record| record.user_id.to_string()).try_collect::<Vec<_>>().await?;

	assert_eq!(ids, ["100", "200"]);

	Ok(())
}
