//! Peer-to-peer network platform node binary. Wires the SQL manager, peer
//! host, storage service, cache spawner, content store client and gateway
//! into one process (§2 "Process composition").

#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use node_cache::CacheSpawner;
use node_content::ContentClient;
use node_gateway::auth::{AuthService, AuthStore};
use node_gateway::auth::jwt::JwtIssuer;
use node_peer::{PeerConfig, PeerEvent, PeerHost};
use node_sql::{SqlManager, SqlManagerConfig};
use node_storage::{StorageClient, StorageService};
use node_util::background::BackgroundRunner;
use node_util::config::Config;
use node_util::error::Result;

#[derive(Parser, Debug)]
#[command(name = "node", about = "Peer-to-peer network platform node")]
struct Opt {
	/// Path to the node's TOML configuration file.
	#[arg(short = 'c', long = "config", env = "NODE_CONFIG_FILE", default_value = "node.toml")]
	config_file: PathBuf,

	/// Path to the replicated-SQL engine binary this node supervises.
	#[arg(long = "sql-engine", env = "NODE_SQL_ENGINE_BINARY", default_value = "rqlited")]
	sql_engine_binary: PathBuf,

	/// Path to the per-namespace cache cluster engine binary.
	#[arg(long = "cache-engine", env = "NODE_CACHE_ENGINE_BINARY", default_value = "olricd")]
	cache_engine_binary: PathBuf,
}

#[tokio::main]
async fn main() {
	let version = option_env!("GIT_VERSION")
		.map(str::to_string)
		.unwrap_or_else(|| git_version::git_version!(prefix = "git:", fallback = "unknown").to_string());

	let opt = Opt::parse();

	if let Err(e) = run(opt, &version).await {
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}
}

async fn run(opt: Opt, version: &str) -> Result<()> {
	let config = Config::load(&opt.config_file)?;
	node_util::logging::init(config.log_format, &config.log_filter);
	info!("node starting (version {})", version);

	let bg = BackgroundRunner::new();

	let signing_key = resolve_signing_key(&config)?;

	let sql = SqlManager::start(SqlManagerConfig {
		engine_binary: opt.sql_engine_binary.clone(),
		data_dir: config.data_dir.clone(),
		http_port: config.sql_port,
		raft_port: config.raft_port,
		advertise_mode: config.advertise_mode,
		join_address: config.join_address.clone(),
		connect_timeout_secs: config.connect_timeout_secs,
		retry_attempts: config.retry_attempts,
		retry_delay_ms: config.retry_delay_ms,
	})
	.await?;

	let bootstrap_multiaddrs = config
		.bootstrap_peers
		.iter()
		.filter_map(|s| s.parse().ok())
		.collect::<Vec<_>>();

	let mut peer_host = PeerHost::new(PeerConfig {
		bootstrap_peers: bootstrap_multiaddrs.clone(),
		discovery_interval: std::time::Duration::from_secs(config.discovery_interval_secs),
		max_connections: config.max_connections,
		enable_mdns: config.enable_mdns,
		chat_like: config.chat_like,
	})
	.map_err(|e| node_util::Error::Message(format!("constructing peer host: {}", e)))?;
	peer_host.connect().await;

	let peer_handle = peer_host.handle.clone();
	let mut peer_events = std::mem::replace(&mut peer_host.events, tokio::sync::mpsc::channel(1).1);

	let discovery_handle = peer_handle.clone();
	let discovery_config = PeerConfig {
		bootstrap_peers: bootstrap_multiaddrs.clone(),
		discovery_interval: std::time::Duration::from_secs(config.discovery_interval_secs),
		max_connections: config.max_connections,
		enable_mdns: config.enable_mdns,
		chat_like: config.chat_like,
	};
	bg.spawn("aggressive-discovery", {
		let handle = discovery_handle.clone();
		let cfg = discovery_config.clone();
		let addrs = bootstrap_multiaddrs.clone();
		let must_exit = bg.must_exit();
		async move {
			node_peer::discovery::aggressive_discovery(handle, cfg, addrs, must_exit).await;
		}
	});
	bg.spawn("discovery-loop", {
		let handle = discovery_handle.clone();
		let cfg = discovery_config.clone();
		let addrs = bootstrap_multiaddrs.clone();
		let must_exit = bg.must_exit();
		async move {
			node_peer::discovery::discovery_loop(handle, cfg, addrs, must_exit).await;
		}
	});
	bg.spawn("connection-monitor", {
		let handle = discovery_handle.clone();
		let must_exit = bg.must_exit();
		async move {
			node_peer::discovery::connection_monitor(handle, must_exit).await;
		}
	});

	let peer_loop_exit = bg.must_exit();
	let peer_loop_handle = tokio::spawn(peer_host.run_event_loop(peer_loop_exit));

	let storage_service = Arc::new(StorageService::new(sql.client().clone()));
	let storage_client = Arc::new(StorageClient::new(peer_handle.clone()));

	let cache_spawner = CacheSpawner::new(config.cache_base_dir.clone(), opt.cache_engine_binary.clone());

	let content_client = Arc::new(ContentClient::new(config.content_store_endpoint.clone())?);

	let auth_store = AuthStore::new(sql.client().clone());
	auth_store.ensure_tables().await?;
	let jwt_issuer = JwtIssuer::new(
		&signing_key,
		config.jwt_issuer.clone(),
		config.jwt_audience.clone(),
		config.access_token_ttl_secs,
		config.refresh_token_ttl_secs,
	);
	let auth_service = Arc::new(AuthService::new(jwt_issuer, auth_store));

	let subscribers = Arc::new(node_gateway::pubsub::registry::SubscriberRegistry::new());
	let presence = Arc::new(node_gateway::pubsub::presence::PresenceRegistry::new());

	let dispatch_task = {
		let storage_service = storage_service.clone();
		let peers = peer_handle.clone();
		let subscribers = subscribers.clone();
		let mut must_exit = bg.must_exit();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					biased;
					_ = must_exit.changed() => {
						if *must_exit.borrow() {
							return;
						}
					}
					event = peer_events.recv() => {
						match event {
							Some(PeerEvent::PubsubMessage { topic, data, .. }) => {
								subscribers.broadcast_local(&topic, &data);
							}
							Some(PeerEvent::StorageRequest { request, channel, .. }) => {
								let response = storage_service.handle_bytes(&request).await;
								peers.respond_storage(channel, response.to_bytes()).await;
							}
							Some(PeerEvent::PeerConnected(peer_id)) => {
								debug!("peer connected: {}", peer_id);
							}
							Some(PeerEvent::PeerDisconnected(peer_id)) => {
								debug!("peer disconnected: {}", peer_id);
							}
							None => return,
						}
					}
				}
			}
		})
	};

	let gateway_state = node_gateway::GatewayState {
		auth: auth_service,
		peers: Arc::new(peer_handle.clone()),
		storage: storage_client,
		cache: cache_spawner,
		content: content_client,
		subscribers,
		presence,
		sql_base_url: format!("http://127.0.0.1:{}", config.sql_port),
	};

	let gateway_addr: SocketAddr = format!("0.0.0.0:{}", config.gateway_port)
		.parse()
		.map_err(|e| node_util::Error::InvalidConfig(format!("gateway bind address: {}", e)))?;

	let gateway_handle = tokio::spawn(node_gateway::serve(gateway_state, gateway_addr));

	wait_for_shutdown_signal().await;
	info!("shutdown signal received, stopping gateway and peer overlay");

	gateway_handle.abort();
	bg.begin_shutdown();
	let _ = peer_loop_handle.await;
	let _ = dispatch_task.await;
	sql.stop().await?;

	info!("node stopped");
	Ok(())
}

/// Uses the configured signing key verbatim, or generates and persists one to
/// `metadata_dir/jwt_signing_key.hex` on first start.
fn resolve_signing_key(config: &Config) -> Result<Vec<u8>> {
	if !config.jwt_signing_key.is_empty() {
		return hex::decode(&config.jwt_signing_key)
			.map_err(|e| node_util::Error::InvalidConfig(format!("jwt_signing_key: {}", e)));
	}
	std::fs::create_dir_all(&config.metadata_dir)?;
	let key_path = config.metadata_dir.join("jwt_signing_key.hex");
	if let Ok(existing) = std::fs::read_to_string(&key_path) {
		return hex::decode(existing.trim())
			.map_err(|e| node_util::Error::InvalidConfig(format!("corrupt jwt_signing_key.hex: {}", e)));
	}
	let mut key = vec![0u8; 32];
	rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
	std::fs::write(&key_path, hex::encode(&key))?;
	Ok(key)
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
	use tokio::signal::unix::{signal, SignalKind};
	let mut sigterm = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		_ = sigterm.recv() => {}
	}
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
}
