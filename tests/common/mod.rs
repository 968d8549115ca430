#![allow(dead_code, unused_imports)]

// std
pub use std::{collections::HashSet, sync::Arc};
// crates.io
pub use httpmock::prelude::*;
pub use serde_json::json;
// self
pub use guild_broker::{
	auth::{GuildId, ProviderId, RoleId, UserId, UserRecord},
	error::Error,
	flows::{Broker, JoinOutcome, NoopProgress, ReconcileReport, RefreshOutcome, RefreshReport},
	oauth::ClientCredentials,
	provider::ProviderDescriptor,
	store::{MemoryStore, TokenStore},
	url::Url,
};
#[cfg(feature = "reqwest")]
pub use guild_broker::{
	flows::ReqwestBroker, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper,
	provider::DefaultProviderStrategy,
};

pub const CLIENT_ID: &str = "client-guild";
pub const CLIENT_SECRET: &str = "secret-guild";
pub const BOT_TOKEN: &str = "bot-token";
pub const GUILD: &str = "4242";
pub const REDIRECT_URI: &str = "https://broker.example.com/callback";

pub fn user(raw: &str) -> UserId {
	UserId::new(raw).expect("User identifier fixture should be valid.")
}

pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	descriptor_with_page_limit(server, ProviderDescriptor::MAX_MEMBER_PAGE_LIMIT)
}

pub fn descriptor_with_page_limit(server: &MockServer, limit: u16) -> ProviderDescriptor {
	let id = ProviderId::new("mock-guild").expect("Provider identifier should be valid.");

	ProviderDescriptor::builder(id)
		.api_base(Url::parse(&server.base_url()).expect("Mock API base should parse."))
		.authorization_endpoint(
			Url::parse(&server.url("/oauth2/authorize"))
				.expect("Mock authorize endpoint should parse."),
		)
		.member_page_limit(limit)
		.build()
		.expect("Mock provider descriptor should build.")
}

pub fn credentials() -> ClientCredentials {
	ClientCredentials::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI, BOT_TOKEN)
		.expect("Client credentials fixture should build.")
}

/// Reqwest transport that trusts the self-signed certificate `httpmock` serves over TLS.
#[cfg(feature = "reqwest")]
pub fn test_http_client() -> ReqwestHttpClient {
	let client = guild_broker::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure reqwest client for tests should build.");

	ReqwestHttpClient::with_client(client)
}

#[cfg(feature = "reqwest")]
pub fn build_broker(descriptor: ProviderDescriptor) -> (ReqwestBroker, Arc<MemoryStore>) {
	let backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn TokenStore> = backend.clone();
	let guild = GuildId::new(GUILD).expect("Guild identifier fixture should be valid.");
	let broker: ReqwestBroker = Broker::with_http_client(
		store,
		descriptor,
		Arc::new(DefaultProviderStrategy),
		credentials(),
		guild,
		test_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_join_delay(std::time::Duration::ZERO);

	(broker, backend)
}

pub async fn seed(store: &MemoryStore, id: &str) {
	let record = UserRecord::new(
		user(id),
		format!("user-{id}"),
		format!("access-{id}"),
		format!("refresh-{id}"),
	);

	store.upsert(record).await.expect("Seeding the memory store should succeed.");
}

pub fn token_body(access: &str, refresh: &str, scope: &str) -> String {
	json!({
		"access_token": access,
		"refresh_token": refresh,
		"token_type": "Bearer",
		"expires_in": 604_800,
		"scope": scope,
	})
	.to_string()
}

pub fn members_path() -> String {
	format!("/guilds/{GUILD}/members")
}

pub fn member_path(id: &str) -> String {
	format!("/guilds/{GUILD}/members/{id}")
}
