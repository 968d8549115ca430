//! Process configuration sourced from the environment.
//!
//! A `.env` file in the working directory is loaded first (when present). Every variable
//! is read by its upper-case name, falling back to the lower-case spelling.

// std
use std::{env, net::SocketAddr};
// self
use crate::{
	_prelude::*,
	auth::{GuildId, RoleId, TokenSecret},
	error::ConfigError,
	oauth::ClientCredentials,
};

/// Settings the binary needs to run the broker and its routes.
#[derive(Clone)]
pub struct AppConfig {
	/// Privileged bot credential.
	pub bot_token: TokenSecret,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the provider.
	pub redirect_uri: String,
	/// Datastore location; a file path or `file://` URI.
	pub datastore_uri: String,
	/// Guild the broker manages.
	pub guild: GuildId,
	/// Role granted after a successful callback.
	pub role: RoleId,
	/// Address the HTTP routes bind to.
	pub bind_addr: SocketAddr,
	/// Where users land after the callback.
	pub post_auth_url: Url,
	/// Pause before each reconciliation join.
	pub join_delay: std::time::Duration,
}
impl AppConfig {
	const DEFAULT_BIND_ADDR: &str = "0.0.0.0:80";
	const DEFAULT_POST_AUTH_URL: &str = "https://discord.com/app";
	const DEFAULT_JOIN_DELAY_MS: u64 = 1_000;

	/// Loads `.env` (if any) and reads the process environment.
	pub fn from_env() -> Result<Self> {
		// A missing `.env` is normal outside local development.
		let _ = dotenvy::dotenv();

		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Reads configuration through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let bind_addr = optional(&lookup, "BIND_ADDR")
			.unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.into())
			.parse::<SocketAddr>()
			.map_err(|e| ConfigError::InvalidEnv { name: "BIND_ADDR", reason: e.to_string() })?;
		let post_auth_url = Url::parse(
			&optional(&lookup, "POST_AUTH_URL")
				.unwrap_or_else(|| Self::DEFAULT_POST_AUTH_URL.into()),
		)
		.map_err(|e| ConfigError::InvalidEnv { name: "POST_AUTH_URL", reason: e.to_string() })?;
		let join_delay_ms = match optional(&lookup, "JOIN_DELAY_MS") {
			Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
				name: "JOIN_DELAY_MS",
				reason: e.to_string(),
			})?,
			None => Self::DEFAULT_JOIN_DELAY_MS,
		};

		Ok(Self {
			bot_token: required(&lookup, "BOT_TOKEN")?.into(),
			client_id: required(&lookup, "CLIENT_ID")?,
			client_secret: required(&lookup, "CLIENT_SECRET")?.into(),
			redirect_uri: required(&lookup, "REDIRECT_URI")?,
			datastore_uri: required(&lookup, "DATASTORE_URI")?,
			guild: GuildId::new(required(&lookup, "GUILD_ID")?).map_err(ConfigError::from)?,
			role: RoleId::new(required(&lookup, "ROLE_ID")?).map_err(ConfigError::from)?,
			bind_addr,
			post_auth_url,
			join_delay: std::time::Duration::from_millis(join_delay_ms),
		})
	}

	/// Application credentials derived from this configuration.
	pub fn credentials(&self) -> Result<ClientCredentials> {
		ClientCredentials::new(
			self.client_id.clone(),
			self.client_secret.expose(),
			self.redirect_uri.clone(),
			self.bot_token.clone(),
		)
	}
}
impl Debug for AppConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppConfig")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("guild", &self.guild)
			.field("role", &self.role)
			.field("bind_addr", &self.bind_addr)
			.field("post_auth_url", &self.post_auth_url.as_str())
			.field("join_delay", &self.join_delay)
			.finish_non_exhaustive()
	}
}

fn optional<F>(lookup: &F, name: &'static str) -> Option<String>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(name)
		.or_else(|| lookup(&name.to_ascii_lowercase()))
		.map(|value| value.trim().to_owned())
		.filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	optional(lookup, name).ok_or(ConfigError::MissingEnv { name })
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect::<HashMap<_, _>>();

		move |name| map.get(name).cloned()
	}

	const FULL: &[(&str, &str)] = &[
		("BOT_TOKEN", "bot"),
		("CLIENT_ID", "123"),
		("CLIENT_SECRET", "shh"),
		("REDIRECT_URI", "https://example.com/callback"),
		("DATASTORE_URI", "file:///tmp/users.json"),
		("GUILD_ID", "42"),
		("ROLE_ID", "7"),
	];

	#[test]
	fn defaults_fill_optional_values() {
		let config = AppConfig::from_lookup(lookup(FULL)).expect("Config should load.");

		assert_eq!(config.bind_addr.to_string(), "0.0.0.0:80");
		assert_eq!(config.post_auth_url.as_str(), "https://discord.com/app");
		assert_eq!(config.join_delay, std::time::Duration::from_secs(1));
		assert_eq!(config.guild.as_ref(), "42");
		assert!(!format!("{config:?}").contains("shh"));
		assert!(config.credentials().is_ok());
	}

	#[test]
	fn lower_case_names_are_accepted() {
		let pairs = FULL
			.iter()
			.map(|(k, v)| (k.to_ascii_lowercase(), *v))
			.collect::<Vec<_>>();
		let pairs = pairs.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>();
		let config = AppConfig::from_lookup(lookup(&pairs)).expect("Config should load.");

		assert_eq!(config.role.as_ref(), "7");
	}

	#[test]
	fn missing_and_invalid_values_are_reported() {
		let err = AppConfig::from_lookup(lookup(&FULL[1..])).expect_err("Missing token must fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingEnv { name: "BOT_TOKEN" })));

		let mut pairs = FULL.to_vec();

		pairs.push(("JOIN_DELAY_MS", "soon"));

		let err = AppConfig::from_lookup(lookup(&pairs)).expect_err("Bad delay must fail.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidEnv { name: "JOIN_DELAY_MS", .. })));
	}
}
