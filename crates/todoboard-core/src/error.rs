use todoboard_shared::PayloadError;

/// Failure of a remote todo operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("invalid todo payload: {0}")]
  InvalidPayload(#[from] PayloadError),

  #[error("request to {url} failed: {source}")]
  Transport {
    url:    String,
    #[source]
    source: reqwest::Error
  },

  #[error("{method} {url} returned HTTP {status}: {body}")]
  Status {
    method: &'static str,
    url:    String,
    status: u16,
    body:   String
  },

  #[error("failed decoding response from {url}: {source}")]
  Decode {
    url:    String,
    #[source]
    source: serde_json::Error
  },

  #[error("invalid request: {0}")]
  Request(String)
}

impl StoreError {
  /// HTTP status of a rejected request.
  pub fn status(&self) -> Option<u16> {
    match self {
      | StoreError::Status {
        status,
        ..
      } => Some(*status),
      | _ => None
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(
      self.status(),
      Some(401 | 403)
    )
  }
}

pub type StoreResult<T> =
  Result<T, StoreError>;
