//! Provider descriptor: the static facts the broker needs about the identity provider.
//!
//! A descriptor names the REST API base every route is joined onto, the browser-facing
//! authorization endpoint, the token route, the scopes a grant must carry before the broker
//! will store it, and the page size used when walking the guild roster. [`discord`] returns
//! the production preset; tests point a builder at a mock server instead.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet},
};

/// Immutable provider descriptor consumed by the provider client and flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Base URL every REST route is appended to.
	pub api_base: Url,
	/// Browser-facing authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint route, relative to [`ProviderDescriptor::api_base`].
	pub token_route: String,
	/// Scopes a grant must include before the broker stores it.
	pub required_scopes: ScopeSet,
	/// Page size used when listing guild members.
	pub member_page_limit: u16,
}
impl ProviderDescriptor {
	/// Token route used by the Discord API.
	pub const DEFAULT_TOKEN_ROUTE: &str = "/oauth2/token";
	/// Largest page the guild member listing accepts.
	pub const MAX_MEMBER_PAGE_LIMIT: u16 = 1_000;

	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Joins `route` onto the API base, keeping the base path (for example `/api/v10`).
	pub fn route_url(&self, route: &str) -> Result<Url, url::ParseError> {
		let base = self.api_base.as_str().trim_end_matches('/');
		let route = route.trim_start_matches('/');

		Url::parse(&format!("{base}/{route}"))
	}
}

/// Production descriptor for Discord's v10 API.
pub fn discord() -> Result<ProviderDescriptor, ProviderDescriptorError> {
	let id = ProviderId::new("discord").map_err(|_| ProviderDescriptorError::InvalidIdentifier)?;
	let api_base = Url::parse("https://discord.com/api/v10")
		.map_err(|_| ProviderDescriptorError::InvalidEndpoint { endpoint: "api_base" })?;
	let authorization = Url::parse("https://discord.com/api/oauth2/authorize")
		.map_err(|_| ProviderDescriptorError::InvalidEndpoint { endpoint: "authorization" })?;

	ProviderDescriptor::builder(id)
		.api_base(api_base)
		.authorization_endpoint(authorization)
		.build()
}
