use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{
  Path,
  PathBuf
};

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info
};

const TOKEN_FILE: &str = "token";

/// Bearer credential for the todo API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
  /// `None` for blank input.
  pub fn new(
    raw: impl Into<String>
  ) -> Option<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      None
    } else {
      Some(Self(trimmed.to_string()))
    }
  }

  pub fn secret(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for AccessToken {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str("AccessToken(<redacted>)")
  }
}

/// Keeps the access token in a single
/// file inside the data directory.
#[derive(Debug, Clone)]
pub struct TokenStore {
  path: PathBuf
}

impl TokenStore {
  #[tracing::instrument(skip(data_dir))]
  pub fn open(
    data_dir: &Path
  ) -> anyhow::Result<Self> {
    fs::create_dir_all(data_dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          data_dir.display()
        )
      })?;
    let path = data_dir.join(TOKEN_FILE);
    debug!(path = %path.display(), "opened token store");
    Ok(Self { path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  #[tracing::instrument(skip(self))]
  pub fn load(
    &self
  ) -> anyhow::Result<Option<AccessToken>>
  {
    if !self.path.exists() {
      return Ok(None);
    }
    let raw =
      fs::read_to_string(&self.path)
        .with_context(|| {
          format!(
            "failed to read {}",
            self.path.display()
          )
        })?;
    Ok(AccessToken::new(raw))
  }

  #[tracing::instrument(skip(self, token))]
  pub fn save(
    &self,
    token: &AccessToken
  ) -> anyhow::Result<()> {
    let parent = self
      .path
      .parent()
      .unwrap_or_else(|| Path::new("."));
    let mut tmp =
      NamedTempFile::new_in(parent)
        .with_context(|| {
          format!(
            "failed to create temp file \
             in {}",
            parent.display()
          )
        })?;
    tmp.write_all(
      token.secret().as_bytes()
    )?;
    tmp.flush()?;
    tmp.persist(&self.path).with_context(
      || {
        format!(
          "failed to persist {}",
          self.path.display()
        )
      }
    )?;
    info!(path = %self.path.display(), "saved access token");
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn clear(
    &self
  ) -> anyhow::Result<bool> {
    if !self.path.exists() {
      return Ok(false);
    }
    fs::remove_file(&self.path)
      .with_context(|| {
        format!(
          "failed to remove {}",
          self.path.display()
        )
      })?;
    info!(path = %self.path.display(), "cleared access token");
    Ok(true)
  }
}

/// Session status reported by the auth
/// collaborator. Opaque to this crate.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct SessionState {
  pub loading: bool,
  pub error:   bool
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum BoardAccess {
  Loading,
  SignInRequired,
  Ready
}

/// What the board should show before
/// any todos are rendered.
pub fn board_access(
  list_loading: bool,
  has_token: bool,
  session: SessionState
) -> BoardAccess {
  if list_loading {
    return BoardAccess::Loading;
  }
  if (!has_token || session.error)
    && !session.loading
  {
    return BoardAccess::SignInRequired;
  }
  BoardAccess::Ready
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::{
    AccessToken,
    BoardAccess,
    SessionState,
    TokenStore,
    board_access
  };

  #[test]
  fn token_roundtrip_and_clear() {
    let temp = tempdir().expect("tempdir");
    let store = TokenStore::open(
      temp.path()
    )
    .expect("open token store");
    assert!(
      store.load().expect("load").is_none()
    );

    let token = AccessToken::new("abc\n")
      .expect("token");
    store.save(&token).expect("save");
    assert_eq!(
      store.load().expect("load"),
      Some(token)
    );

    assert!(store.clear().expect("clear"));
    assert!(!store.clear().expect("clear"));
  }

  #[test]
  fn blank_token_is_absent() {
    assert!(AccessToken::new("  ").is_none());
  }

  #[test]
  fn debug_redacts_secret() {
    let token = AccessToken::new("s3cret")
      .expect("token");
    assert!(
      !format!("{token:?}").contains("s3cret")
    );
  }

  #[test]
  fn access_gate() {
    let ok = SessionState::default();
    assert_eq!(
      board_access(true, false, ok),
      BoardAccess::Loading
    );
    assert_eq!(
      board_access(false, false, ok),
      BoardAccess::SignInRequired
    );
    assert_eq!(
      board_access(false, true, ok),
      BoardAccess::Ready
    );
    assert_eq!(
      board_access(
        false,
        true,
        SessionState {
          loading: false,
          error:   true
        }
      ),
      BoardAccess::SignInRequired
    );
    assert_eq!(
      board_access(
        false,
        false,
        SessionState {
          loading: true,
          error:   false
        }
      ),
      BoardAccess::Ready
    );
  }
}
