use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
	Pending,
	Starting,
	Running,
	Failed,
	Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
	pub namespace: String,
	pub node_id: String,
	pub http_port: u16,
	pub memberlist_port: u16,
	pub state: InstanceState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Default)]
pub(crate) struct Registry {
	instances: RwLock<HashMap<(String, String), InstanceStatus>>,
}

impl Registry {
	pub fn get(&self, namespace: &str, node_id: &str) -> Option<InstanceStatus> {
		self.instances
			.read()
			.unwrap()
			.get(&(namespace.to_string(), node_id.to_string()))
			.cloned()
	}

	pub fn insert(&self, status: InstanceStatus) {
		let key = (status.namespace.clone(), status.node_id.clone());
		self.instances.write().unwrap().insert(key, status);
	}

	pub fn set_state(&self, namespace: &str, node_id: &str, state: InstanceState, error: Option<String>) {
		if let Some(entry) = self
			.instances
			.write()
			.unwrap()
			.get_mut(&(namespace.to_string(), node_id.to_string()))
		{
			entry.state = state;
			entry.error = error;
		}
	}

	pub fn list(&self) -> Vec<InstanceStatus> {
		self.instances.read().unwrap().values().cloned().collect()
	}

	/// Remove an instance from the registry. Valid only when it is already
	/// `Stopped` or `Failed`; disk artifacts are left untouched.
	pub fn remove(&self, namespace: &str, node_id: &str) -> Option<InstanceStatus> {
		let key = (namespace.to_string(), node_id.to_string());
		let mut guard = self.instances.write().unwrap();
		match guard.get(&key) {
			Some(status) if matches!(status.state, InstanceState::Stopped | InstanceState::Failed) => {
				guard.remove(&key)
			}
			_ => None,
		}
	}
}
