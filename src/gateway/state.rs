//! Shared gateway state: one instance per node, constructed once at startup
//! and handed to axum as `State<GatewayState>`. Every field is an owned
//! service object behind an `Arc`, per §9 "no process-global singletons".

use std::sync::Arc;

use node_cache::CacheSpawner;
use node_content::ContentClient;
use node_peer::PeerHandle;
use node_storage::StorageClient;

use crate::auth::AuthService;
use crate::pubsub::presence::PresenceRegistry;
use crate::pubsub::registry::SubscriberRegistry;

#[derive(Clone)]
pub struct GatewayState {
	pub auth: Arc<AuthService>,
	pub peers: Arc<PeerHandle>,
	pub storage: Arc<StorageClient>,
	pub cache: Arc<CacheSpawner>,
	pub content: Arc<ContentClient>,
	pub subscribers: Arc<SubscriberRegistry>,
	pub presence: Arc<PresenceRegistry>,
	/// Base URL of this node's own SQL-replication child, used only to
	/// report cluster health in `/v1/cluster/status` (§4.1).
	pub sql_base_url: String,
}

/// The namespace/credential resolved for one request, stamped once by the
/// auth middleware and read by every downstream handler.
#[derive(Clone, Debug)]
pub struct RequestContext {
	pub namespace: String,
	pub credential: crate::auth::Credential,
}

impl RequestContext {
	pub fn internal(namespace: impl Into<String>) -> Self {
		RequestContext {
			namespace: namespace.into(),
			credential: crate::auth::Credential::Internal,
		}
	}
}
