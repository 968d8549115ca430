// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet},
	provider::ProviderDescriptor,
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// The REST API base URL is required.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Authorization endpoint is required to build consent URLs.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Endpoints must be absolute HTTP(S) URLs.
	#[error("The {endpoint} endpoint must be an absolute http(s) URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// The token route must be a non-empty path.
	#[error("Token route must start with `/`.")]
	InvalidTokenRoute,
	/// A grant without required scopes would let any consent through.
	#[error("Descriptor must require at least one scope.")]
	NoRequiredScopes,
	/// Member pages must hold between 1 and 1000 entries.
	#[error("Member page limit {limit} is outside 1..=1000.")]
	InvalidPageLimit {
		/// Rejected limit.
		limit: u16,
	},
	/// Preset identifier failed validation.
	#[error("Descriptor identifier is invalid.")]
	InvalidIdentifier,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// REST API base URL.
	pub api_base: Option<Url>,
	/// Browser-facing authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint route.
	pub token_route: String,
	/// Scopes every grant must carry.
	pub required_scopes: Option<ScopeSet>,
	/// Page size for roster listing.
	pub member_page_limit: u16,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			api_base: None,
			authorization_endpoint: None,
			token_route: ProviderDescriptor::DEFAULT_TOKEN_ROUTE.into(),
			required_scopes: None,
			member_page_limit: ProviderDescriptor::MAX_MEMBER_PAGE_LIMIT,
		}
	}

	/// Sets the REST API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Overrides the token route (defaults to `/oauth2/token`).
	pub fn token_route(mut self, route: impl Into<String>) -> Self {
		self.token_route = route.into();

		self
	}

	/// Overrides the required scopes (defaults to `identify guilds.join`).
	pub fn required_scopes(mut self, scopes: ScopeSet) -> Self {
		self.required_scopes = Some(scopes);

		self
	}

	/// Overrides the member listing page size.
	pub fn member_page_limit(mut self, limit: u16) -> Self {
		self.member_page_limit = limit;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let api_base = self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?;
		let authorization_endpoint = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let required_scopes = match self.required_scopes {
			Some(scopes) => scopes,
			None => ScopeSet::new(["identify", "guilds.join"])
				.map_err(|_| ProviderDescriptorError::NoRequiredScopes)?,
		};
		let descriptor = ProviderDescriptor {
			id: self.id,
			api_base,
			authorization_endpoint,
			token_route: self.token_route,
			required_scopes,
			member_page_limit: self.member_page_limit,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("api_base", &self.api_base)?;
		validate_endpoint("authorization", &self.authorization_endpoint)?;

		if !self.token_route.starts_with('/') || self.token_route.len() < 2 {
			return Err(ProviderDescriptorError::InvalidTokenRoute);
		}
		if self.required_scopes.is_empty() {
			return Err(ProviderDescriptorError::NoRequiredScopes);
		}
		if !(1..=Self::MAX_MEMBER_PAGE_LIMIT).contains(&self.member_page_limit) {
			return Err(ProviderDescriptorError::InvalidPageLimit {
				limit: self.member_page_limit,
			});
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if matches!(url.scheme(), "http" | "https") && url.has_host() {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InvalidEndpoint { endpoint: name })
	}
}
