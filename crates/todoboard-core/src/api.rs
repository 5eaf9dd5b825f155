use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
  Client,
  RequestBuilder,
  Url
};
use serde::de::DeserializeOwned;
use todoboard_shared::{
  Todo,
  TodoId,
  TodoListResult,
  UpsertTodo
};
use tracing::{
  debug,
  instrument,
  warn
};
use uuid::Uuid;

use crate::error::{
  StoreError,
  StoreResult
};
use crate::session::AccessToken;

pub const DEFAULT_TODOS_PATH: &str =
  "/api/auth/todos";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const REQUEST_ID_HEADER: &str =
  "x-request-id";

/// The remote todo service.
///
/// Reads always carry a credential;
/// writes attach one when the caller
/// has it.
#[async_trait]
pub trait TodoApi: Send + Sync {
  async fn list_todos(
    &self,
    params: &[(String, String)],
    token: &AccessToken
  ) -> StoreResult<TodoListResult>;

  async fn create_todo(
    &self,
    payload: &UpsertTodo,
    token: Option<&AccessToken>
  ) -> StoreResult<Todo>;

  /// `payload.id` equals `id`.
  async fn update_todo(
    &self,
    id: &TodoId,
    payload: &UpsertTodo,
    token: Option<&AccessToken>
  ) -> StoreResult<Todo>;

  async fn delete_todo(
    &self,
    id: &TodoId,
    token: Option<&AccessToken>
  ) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
  pub base_url:   String,
  pub todos_path: String,
  pub timeout:    Duration
}

impl ApiSettings {
  pub fn new(
    base_url: impl Into<String>
  ) -> Self {
    Self {
      base_url:   base_url.into(),
      todos_path: DEFAULT_TODOS_PATH
        .to_string(),
      timeout:    Duration::from_secs(
        DEFAULT_TIMEOUT_SECS
      )
    }
  }
}

/// [`TodoApi`] over HTTP + JSON.
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
  client:     Client,
  collection: Url
}

impl HttpTodoApi {
  pub fn new(
    settings: &ApiSettings
  ) -> StoreResult<Self> {
    let raw = format!(
      "{}/{}",
      settings.base_url.trim_end_matches('/'),
      settings
        .todos_path
        .trim_start_matches('/')
    );
    let collection = Url::parse(&raw)
      .map_err(|err| {
        StoreError::Request(format!(
          "invalid todo API url {raw}: \
           {err}"
        ))
      })?;
    let client = Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|source| {
        StoreError::Transport {
          url: raw.clone(),
          source
        }
      })?;
    debug!(url = %collection, "todo API client ready");
    Ok(Self { client, collection })
  }

  pub fn collection_url(&self) -> &Url {
    &self.collection
  }

  fn item_url(
    &self,
    id: &TodoId
  ) -> StoreResult<Url> {
    let mut url = self.collection.clone();
    url
      .path_segments_mut()
      .map_err(|()| {
        StoreError::Request(format!(
          "todo API url cannot take \
           path segments: {}",
          self.collection
        ))
      })?
      .pop_if_empty()
      .push(id.as_str());
    Ok(url)
  }

  fn prepare(
    &self,
    request: RequestBuilder,
    token: Option<&AccessToken>,
    request_id: Uuid
  ) -> RequestBuilder {
    let request = request.header(
      REQUEST_ID_HEADER,
      request_id.to_string()
    );
    match token {
      | Some(token) => {
        request.bearer_auth(token.secret())
      }
      | None => request
    }
  }

  async fn execute(
    &self,
    method: &'static str,
    url: &Url,
    request: RequestBuilder
  ) -> StoreResult<String> {
    let response = request
      .send()
      .await
      .map_err(|source| {
        StoreError::Transport {
          url: url.to_string(),
          source
        }
      })?;
    let status = response.status();
    let body =
      response.text().await.map_err(
        |source| StoreError::Transport {
          url: url.to_string(),
          source
        }
      )?;

    if !status.is_success() {
      warn!(
        method,
        url = %url,
        status = status.as_u16(),
        "todo API rejected request"
      );
      return Err(StoreError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body
      });
    }

    debug!(
      method,
      url = %url,
      status = status.as_u16(),
      bytes = body.len(),
      "todo API request succeeded"
    );
    Ok(body)
  }
}

fn decode<T: DeserializeOwned>(
  url: &Url,
  body: &str
) -> StoreResult<T> {
  serde_json::from_str(body).map_err(
    |source| StoreError::Decode {
      url: url.to_string(),
      source
    }
  )
}

#[async_trait]
impl TodoApi for HttpTodoApi {
  #[instrument(skip(self, token), fields(request_id))]
  async fn list_todos(
    &self,
    params: &[(String, String)],
    token: &AccessToken
  ) -> StoreResult<TodoListResult> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record(
      "request_id",
      tracing::field::display(request_id)
    );
    let mut url = self.collection.clone();
    if !params.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(params.iter());
    }
    let request = self.prepare(
      self.client.get(url.clone()),
      Some(token),
      request_id
    );
    let body =
      self.execute("GET", &url, request).await?;
    decode(&url, &body)
  }

  #[instrument(skip(self, payload, token), fields(request_id, title_len = payload.title.len()))]
  async fn create_todo(
    &self,
    payload: &UpsertTodo,
    token: Option<&AccessToken>
  ) -> StoreResult<Todo> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record(
      "request_id",
      tracing::field::display(request_id)
    );
    let url = self.collection.clone();
    let request = self.prepare(
      self.client.post(url.clone()).json(payload),
      token,
      request_id
    );
    let body = self
      .execute("POST", &url, request)
      .await?;
    decode(&url, &body)
  }

  #[instrument(skip(self, payload, token), fields(request_id, id = %id))]
  async fn update_todo(
    &self,
    id: &TodoId,
    payload: &UpsertTodo,
    token: Option<&AccessToken>
  ) -> StoreResult<Todo> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record(
      "request_id",
      tracing::field::display(request_id)
    );
    let url = self.item_url(id)?;
    let request = self.prepare(
      self.client.put(url.clone()).json(payload),
      token,
      request_id
    );
    let body =
      self.execute("PUT", &url, request).await?;
    decode(&url, &body)
  }

  #[instrument(skip(self, token), fields(request_id, id = %id))]
  async fn delete_todo(
    &self,
    id: &TodoId,
    token: Option<&AccessToken>
  ) -> StoreResult<()> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record(
      "request_id",
      tracing::field::display(request_id)
    );
    let url = self.item_url(id)?;
    let request = self.prepare(
      self.client.delete(url.clone()),
      token,
      request_id
    );
    self
      .execute("DELETE", &url, request)
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use todoboard_shared::TodoId;

  use super::{
    ApiSettings,
    HttpTodoApi
  };

  #[test]
  fn joins_base_and_path() {
    let api = HttpTodoApi::new(
      &ApiSettings::new(
        "http://localhost:3000/"
      )
    )
    .expect("client");
    assert_eq!(
      api.collection_url().as_str(),
      "http://localhost:3000/api/auth/todos"
    );
  }

  #[test]
  fn item_url_escapes_id() {
    let api = HttpTodoApi::new(
      &ApiSettings::new(
        "http://localhost:3000"
      )
    )
    .expect("client");
    let url = api
      .item_url(&TodoId::from("a/b"))
      .expect("item url");
    assert_eq!(
      url.as_str(),
      "http://localhost:3000/api/auth/todos/a%2Fb"
    );
  }

  #[test]
  fn rejects_unparseable_base() {
    assert!(
      HttpTodoApi::new(&ApiSettings::new(
        "not a url"
      ))
      .is_err()
    );
  }
}
