//! Transport primitives for provider REST calls.
//!
//! [`ProviderHttpClient`] is the broker's only dependency on an HTTP stack: it executes a
//! fully-formed [`HttpRequest`] and hands back the raw status, body, and `Retry-After`
//! hint. Classification into broker outcomes happens one layer up, in
//! [`ProviderClient`](crate::provider::ProviderClient), so custom transports never need to
//! know about provider semantics.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`ProviderHttpClient::execute`].
pub type HttpFuture<'a, E> = Pin<Box<dyn Future<Output = Result<RawResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing provider calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// broker clone, and the returned futures must be `Send` so broker flows can run on any
/// executor thread.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request` and returns the raw response, whatever its status.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// HTTP methods the provider client is allowed to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
}
impl HttpMethod {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for HttpMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(HttpMethod::Get),
			"POST" => Ok(HttpMethod::Post),
			"PUT" => Ok(HttpMethod::Put),
			_ => Err(Error::UnsupportedMethod { method: s.to_owned() }),
		}
	}
}

/// Request body attached to an [`HttpRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// `application/x-www-form-urlencoded` pairs.
	Form(Vec<(String, String)>),
	/// Pre-serialized `application/json` bytes.
	Json(Vec<u8>),
}

/// Fully-formed outbound request.
#[derive(Clone)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Absolute target URL.
	pub url: Url,
	/// `Authorization` header value, when the call is authenticated.
	pub authorization: Option<String>,
	/// Request body.
	pub body: RequestBody,
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authorization_set", &self.authorization.is_some())
			.finish()
	}
}

/// Raw response captured by the transport.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Response body bytes.
	pub body: Vec<u8>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Put => reqwest::Method::PUT,
			};
			let mut builder = client.request(method, request.url);

			if let Some(value) = request.authorization {
				builder = builder.header(AUTHORIZATION, value);
			}

			builder = match request.body {
				// The provider insists on a Content-Length for body-less writes.
				RequestBody::Empty if request.method != HttpMethod::Get => builder.body(Vec::new()),
				RequestBody::Empty => builder,
				RequestBody::Form(pairs) => builder.form(&pairs),
				RequestBody::Json(bytes) =>
					builder.header(CONTENT_TYPE, "application/json").body(bytes),
			};

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return i64::try_from(secs).ok().map(Duration::seconds);
	}
	if let Ok(secs) = raw.parse::<f64>() {
		return Duration::checked_seconds_f64(secs).filter(|delay| !delay.is_negative());
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	fn headers(value: &'static str) -> HeaderMap {
		let mut map = HeaderMap::new();

		map.insert(RETRY_AFTER, HeaderValue::from_static(value));

		map
	}

	#[test]
	fn retry_after_accepts_integer_and_fractional_seconds() {
		assert_eq!(parse_retry_after(&headers("5")), Some(Duration::seconds(5)));
		assert_eq!(parse_retry_after(&headers("1.5")), Some(Duration::milliseconds(1_500)));
		assert_eq!(parse_retry_after(&headers("soon")), None);
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}

	#[test]
	fn retry_after_ignores_values_that_do_not_fit_a_duration() {
		// Above `i64::MAX` but still a valid `u64`.
		assert_eq!(parse_retry_after(&headers("18446744073709551615")), None);
		// Too large for `u64`, so it parses as a finite `f64`.
		assert_eq!(parse_retry_after(&headers("99999999999999999999")), None);
		assert_eq!(parse_retry_after(&headers("-3")), None);
		assert_eq!(parse_retry_after(&headers("NaN")), None);
	}

	#[test]
	fn methods_parse_case_insensitively_and_reject_others() {
		assert_eq!("put".parse::<HttpMethod>().expect("PUT should parse."), HttpMethod::Put);
		assert_eq!("GET".parse::<HttpMethod>().expect("GET should parse."), HttpMethod::Get);

		let err = "DELETE".parse::<HttpMethod>().expect_err("DELETE must be rejected.");

		assert!(matches!(err, Error::UnsupportedMethod { method } if method == "DELETE"));
	}

	#[test]
	fn request_debug_hides_authorization() {
		let request = HttpRequest {
			method: HttpMethod::Get,
			url: Url::parse("https://example.com/users/@me").expect("URL fixture should parse."),
			authorization: Some("Bot secret-token".into()),
			body: RequestBody::Empty,
		};
		let rendered = format!("{request:?}");

		assert!(!rendered.contains("secret-token"));
		assert!(rendered.contains("authorization_set: true"));
	}
}
