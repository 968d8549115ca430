//! Provider-facing descriptors (data), strategies (behavior), and the typed REST client.
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]) covering the API base,
//! authorization endpoint, token route, and the scopes every grant must carry.
//! `strategy` defines [`ProviderStrategy`], an HTTP-client-agnostic hook that maps raw
//! responses into the broker error taxonomy. `client` combines both with a transport and
//! decodes each endpoint's body once into a tagged result.

pub mod client;
pub mod descriptor;
pub mod strategy;

pub use client::*;
pub use descriptor::*;
pub use strategy::*;
