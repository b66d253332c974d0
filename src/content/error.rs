use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
	#[error("content not found: {0}")]
	NotFound(String),
	#[error("content daemon returned status {0}")]
	Daemon(u16),
	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;

impl From<ContentError> for node_util::error::Error {
	fn from(e: ContentError) -> Self {
		match e {
			ContentError::NotFound(cid) => node_util::error::Error::NotFound(cid),
			other => node_util::error::Error::Message(other.to_string()),
		}
	}
}
