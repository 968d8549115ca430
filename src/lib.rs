//! OAuth 2.0 token lifecycle broker that keeps a guild's membership reconciled with every
//! user who authorized the application.
//!
//! The crate exchanges authorization codes, persists and rotates token pairs, and drives a
//! rate-limited reconciliation loop that adds every stored user to the managed guild while
//! purging records whose grants are gone for good.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod commands;
#[cfg(feature = "server")] pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "server")] pub mod server;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
