use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("instance {0} not found")]
	NotFound(String),
	#[error("instance {0} is not stopped or failed")]
	NotRemovable(String),
	#[error("instance {0} failed to start: {1}")]
	InstanceFailed(String, String),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("config serialization error: {0}")]
	Config(#[from] serde_yaml::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

impl From<CacheError> for node_util::error::Error {
	fn from(e: CacheError) -> Self {
		match e {
			CacheError::NotFound(k) => node_util::error::Error::NotFound(k),
			other => node_util::error::Error::Message(other.to_string()),
		}
	}
}
