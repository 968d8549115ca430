//! `guild-broker` binary: loads configuration, opens the token store, verifies the bot
//! credential, and serves the HTTP routes.

// std
use std::{process::ExitCode, sync::Arc};
// self
use guild_broker::{
	config::AppConfig,
	flows::ReqwestBroker,
	obs, provider,
	server::{self, ServerState},
	store::FileStore,
};

#[tokio::main]
async fn main() -> ExitCode {
	obs::init_subscriber();

	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			tracing::error!(error = %err, "fatal");

			ExitCode::FAILURE
		},
	}
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
	let config = AppConfig::from_env()?;
	let store = FileStore::from_uri(&config.datastore_uri)?;

	tracing::info!(path = %store.path().display(), "token store opened");

	let descriptor = provider::discord()?;
	let broker =
		ReqwestBroker::new(Arc::new(store), descriptor, config.credentials()?, config.guild.clone())
			.with_join_delay(config.join_delay);
	let bot = broker.verify_service_credential().await?;

	tracing::info!(bot = %bot.username, id = %bot.id, "service credential verified");

	let state = ServerState {
		broker,
		role: config.role.clone(),
		post_auth_url: config.post_auth_url.clone(),
	};

	server::serve(Arc::new(state), config.bind_addr).await?;

	Ok(())
}
