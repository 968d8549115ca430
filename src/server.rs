//! HTTP routes around the broker.
//!
//! | Route | Behavior |
//! | --- | --- |
//! | `GET /` | 302 to the post-auth destination |
//! | `GET /auth` | redirect to the provider's consent page |
//! | `GET /callback?code=` | exchange + role grant, then always 302 to the post-auth destination |
//! | `GET /join_all` | reconcile the guild, answer `done` |
//! | `GET /refresh_all` | reconcile, refresh every record, answer `done` |

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	extract::{Query, State},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Redirect, Response},
	routing::get,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::RoleId,
	flows::{NoopProgress, ReqwestBroker},
};

/// Shared state handed to every route.
#[derive(Clone, Debug)]
pub struct ServerState {
	/// Broker serving every route.
	pub broker: ReqwestBroker,
	/// Role granted on callback.
	pub role: RoleId,
	/// Where users land after `/` and `/callback`.
	pub post_auth_url: Url,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
	#[serde(default)]
	code: Option<String>,
}

/// Builds the route table.
pub fn router(state: Arc<ServerState>) -> Router {
	Router::new()
		.route("/", get(root))
		.route("/auth", get(auth))
		.route("/callback", get(callback))
		.route("/join_all", get(join_all))
		.route("/refresh_all", get(refresh_all))
		.with_state(state)
}

/// Binds `addr` and serves the routes until the process exits.
pub async fn serve(state: Arc<ServerState>, addr: SocketAddr) -> std::io::Result<()> {
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(address = %addr, "server listening");

	axum::serve(listener, router(state)).await
}

async fn root(State(state): State<Arc<ServerState>>) -> Response {
	found(&state.post_auth_url)
}

async fn auth(State(state): State<Arc<ServerState>>) -> Redirect {
	Redirect::temporary(state.broker.authorization_url().as_str())
}

async fn callback(
	State(state): State<Arc<ServerState>>,
	Query(params): Query<CallbackParams>,
) -> Response {
	if let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) {
		match state.broker.validate_and_grant_role(code, &state.role).await {
			Ok(true) => tracing::info!("role granted"),
			Ok(false) => tracing::info!("member lookup inconclusive; role not granted"),
			Err(err) => tracing::warn!(error = %err, "callback failed"),
		}
	}

	found(&state.post_auth_url)
}

async fn join_all(State(state): State<Arc<ServerState>>) -> Response {
	match state.broker.join_all(&NoopProgress).await {
		Ok(report) => {
			tracing::info!(
				attempted = report.attempted,
				joined = report.joined,
				skipped = report.skipped,
				purged = report.purged,
				"join_all finished"
			);

			"done".into_response()
		},
		Err(err) => failed("join_all", err),
	}
}

async fn refresh_all(State(state): State<Arc<ServerState>>) -> Response {
	if let Err(err) = state.broker.join_all(&NoopProgress).await {
		return failed("refresh_all", err);
	}

	match state.broker.refresh_all().await {
		Ok(report) => {
			tracing::info!(
				attempted = report.attempted,
				refreshed = report.refreshed,
				purged = report.purged,
				failed = report.failed,
				"refresh_all finished"
			);

			"done".into_response()
		},
		Err(err) => failed("refresh_all", err),
	}
}

fn found(url: &Url) -> Response {
	(StatusCode::FOUND, [(LOCATION, url.as_str().to_owned())]).into_response()
}

fn failed(route: &'static str, err: Error) -> Response {
	tracing::error!(route, error = %err, "batch route failed");

	(StatusCode::INTERNAL_SERVER_ERROR, "failed").into_response()
}
