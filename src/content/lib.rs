//! Thin HTTP client for the co-located content-addressed daemon and its
//! cluster pin API (§4.6 of the design spec). Deliberately trivial: the
//! gateway is the only caller, and this crate exists so that contract is
//! typed rather than ad hoc `reqwest` calls sprinkled through the gateway.

#[macro_use]
extern crate tracing;

mod error;

pub use error::{ContentError, ContentResult};

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinStatus {
	Pinned,
	Pinning,
	Queued,
	Unpinned,
	Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinInfo {
	pub cid: String,
	#[serde(default)]
	pub name: Option<String>,
	pub status: PinStatus,
	#[serde(default)]
	pub replication_min: Option<u32>,
	#[serde(default)]
	pub replication_max: Option<u32>,
	#[serde(default)]
	pub peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
	pub cid: String,
	pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatus {
	pub peers: Vec<String>,
	#[serde(default)]
	pub healthy: bool,
}

/// Auth forwarded to the daemon on every request, matching whichever scheme
/// the gateway resolved the caller's credential with (§4.4).
#[derive(Debug, Clone)]
pub enum ForwardedAuth {
	Bearer(String),
	ApiKey(String),
	None,
}

#[derive(Clone)]
pub struct ContentClient {
	http: reqwest::Client,
	base_url: String,
}

impl ContentClient {
	pub fn new(base_url: impl Into<String>) -> ContentResult<Self> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(60))
			.build()?;
		Ok(ContentClient {
			http,
			base_url: base_url.into(),
		})
	}

	fn apply_auth(&self, builder: reqwest::RequestBuilder, auth: &ForwardedAuth) -> reqwest::RequestBuilder {
		match auth {
			ForwardedAuth::Bearer(token) => builder.bearer_auth(token),
			ForwardedAuth::ApiKey(key) => builder.header("X-API-Key", key),
			ForwardedAuth::None => builder,
		}
	}

	/// Upload a blob, tagging it with `name` (the gateway stamps the caller's
	/// namespace into this so pinned content stays attributable to a tenant
	/// even though the daemon has no namespace concept of its own).
	pub async fn upload(&self, name: &str, data: Bytes, auth: &ForwardedAuth) -> ContentResult<UploadResult> {
		let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string());
		let form = reqwest::multipart::Form::new().part("file", part);

		let req = self.http.post(format!("{}/api/v0/add", self.base_url)).multipart(form);
		let resp = self.apply_auth(req, auth).send().await?;
		Self::check_status(&resp)?;
		Ok(resp.json().await?)
	}

	pub async fn pin(&self, cid: &str, name: &str, auth: &ForwardedAuth) -> ContentResult<PinInfo> {
		let req = self
			.http
			.post(format!("{}/api/v0/pin/add", self.base_url))
			.query(&[("arg", cid), ("name", name)]);
		let resp = self.apply_auth(req, auth).send().await?;
		Self::check_status(&resp)?;
		Ok(resp.json().await?)
	}

	pub async fn status(&self, cid: &str, auth: &ForwardedAuth) -> ContentResult<PinInfo> {
		let req = self
			.http
			.get(format!("{}/api/v0/pin/status", self.base_url))
			.query(&[("arg", cid)]);
		let resp = self.apply_auth(req, auth).send().await?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(ContentError::NotFound(cid.to_string()));
		}
		Self::check_status(&resp)?;
		Ok(resp.json().await?)
	}

	/// Stream a blob's bytes back. Callers forward this directly to the HTTP
	/// response body rather than buffering it.
	pub async fn get(&self, cid: &str, auth: &ForwardedAuth) -> ContentResult<reqwest::Response> {
		let req = self.http.get(format!("{}/api/v0/cat", self.base_url)).query(&[("arg", cid)]);
		let resp = self.apply_auth(req, auth).send().await?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(ContentError::NotFound(cid.to_string()));
		}
		Self::check_status(&resp)?;
		Ok(resp)
	}

	pub async fn unpin(&self, cid: &str, auth: &ForwardedAuth) -> ContentResult<()> {
		let req = self
			.http
			.post(format!("{}/api/v0/pin/rm", self.base_url))
			.query(&[("arg", cid)]);
		let resp = self.apply_auth(req, auth).send().await?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(ContentError::NotFound(cid.to_string()));
		}
		Self::check_status(&resp)?;
		Ok(())
	}

	/// Passthrough to the daemon's own cluster API, used to enrich the
	/// gateway's `/v1/storage/status/{cid}` response with replication info.
	pub async fn cluster_status(&self, auth: &ForwardedAuth) -> ContentResult<ClusterStatus> {
		let req = self.http.get(format!("{}/api/v0/cluster/status", self.base_url));
		let resp = self.apply_auth(req, auth).send().await?;
		Self::check_status(&resp)?;
		Ok(resp.json().await?)
	}

	fn check_status(resp: &reqwest::Response) -> ContentResult<()> {
		if resp.status().is_success() {
			Ok(())
		} else {
			Err(ContentError::Daemon(resp.status().as_u16()))
		}
	}
}
