use parking_lot::Mutex;
use todoboard_shared::{
  PayloadError,
  Todo,
  TodoId,
  TodoListResult,
  UpsertTodo
};
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::api::TodoApi;
use crate::cache::QueryCache;
use crate::error::{
  StoreError,
  StoreResult
};
use crate::filter::{
  TodoFilter,
  query_key
};
use crate::notify::Notifier;
use crate::session::AccessToken;

pub const CREATED_MESSAGE: &str =
  "Todo created successfully";
pub const UPDATED_MESSAGE: &str =
  "Todo updated successfully";
pub const DELETED_MESSAGE: &str =
  "Todo deleted successfully";

/// Outcome of a list read.
#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
  /// No credential; nothing was
  /// requested.
  Disabled,
  Ready(TodoListResult)
}

impl ListState {
  pub fn result(
    &self
  ) -> Option<&TodoListResult> {
    match self {
      | ListState::Ready(result) => {
        Some(result)
      }
      | ListState::Disabled => None
    }
  }

  pub fn todos(&self) -> &[Todo] {
    self
      .result()
      .map(|result| result.todos.as_slice())
      .unwrap_or_default()
  }
}

/// Client-side owner of the todo list.
///
/// Reads go through the query cache;
/// every successful write invalidates
/// all cached lists and then announces
/// itself through the notifier.
pub struct TodoStore<A> {
  api:      A,
  cache:    Mutex<QueryCache>,
  notifier: Notifier
}

impl<A: TodoApi> TodoStore<A> {
  pub fn new(
    api: A,
    notifier: Notifier
  ) -> Self {
    Self {
      api,
      cache: Mutex::new(QueryCache::new()),
      notifier
    }
  }

  pub fn api(&self) -> &A {
    &self.api
  }

  pub fn notifier(&self) -> &Notifier {
    &self.notifier
  }

  /// Number of cache invalidations so
  /// far.
  pub fn invalidations(&self) -> u64 {
    self.cache.lock().invalidations()
  }

  /// Reads the list selected by
  /// `filter`. Without a credential the
  /// read is disabled rather than
  /// failed.
  #[instrument(skip(self, credential), fields(authenticated = credential.is_some()))]
  pub async fn list_todos(
    &self,
    filter: &TodoFilter,
    credential: Option<&AccessToken>
  ) -> StoreResult<ListState> {
    let Some(token) = credential else {
      debug!(
        "no access credential; list read \
         disabled"
      );
      return Ok(ListState::Disabled);
    };

    let params =
      filter.to_query_params().map_err(
        |err| {
          StoreError::Request(format!(
            "{err:#}"
          ))
        }
      )?;
    let key = query_key(&params);

    let cached =
      self.cache.lock().fresh(&key);
    if let Some(hit) = cached {
      debug!(key = key.as_str(), "todo list served from cache");
      return Ok(ListState::Ready(hit));
    }

    let result = self
      .api
      .list_todos(&params, token)
      .await?;
    info!(
      key = key.as_str(),
      todos = result.todos.len(),
      total = result.total,
      "fetched todo list"
    );
    self
      .cache
      .lock()
      .store(key, result.clone());
    Ok(ListState::Ready(result))
  }

  /// Last fetched list for `filter`,
  /// even if it has since been
  /// invalidated.
  pub fn todo_snapshot(
    &self,
    filter: &TodoFilter
  ) -> Option<TodoListResult> {
    let key = filter.cache_key().ok()?;
    self.cache.lock().last_known(&key).cloned()
  }

  #[instrument(skip(self, payload, credential), fields(title_len = payload.title.len()))]
  pub async fn create_todo(
    &self,
    payload: &UpsertTodo,
    credential: Option<&AccessToken>
  ) -> StoreResult<Todo> {
    payload.validate()?;
    let mut body = payload.clone();
    body.id = None;
    let created = self
      .api
      .create_todo(&body, credential)
      .await
      .inspect_err(|err| {
        warn!(error = %err, "create todo failed");
      })?;
    self.after_write(CREATED_MESSAGE);
    Ok(created)
  }

  /// Sends the full todo. The id both
  /// addresses the request and travels
  /// in the body.
  #[instrument(skip(self, payload, credential), fields(id = ?payload.id))]
  pub async fn update_todo(
    &self,
    payload: &UpsertTodo,
    credential: Option<&AccessToken>
  ) -> StoreResult<Todo> {
    let id = payload
      .id
      .clone()
      .ok_or(PayloadError::MissingId)?;
    payload.validate()?;
    let updated = self
      .api
      .update_todo(&id, payload, credential)
      .await
      .inspect_err(|err| {
        warn!(error = %err, "update todo failed");
      })?;
    self.after_write(UPDATED_MESSAGE);
    Ok(updated)
  }

  #[instrument(skip(self, credential), fields(id = %id))]
  pub async fn delete_todo(
    &self,
    id: &TodoId,
    credential: Option<&AccessToken>
  ) -> StoreResult<()> {
    self
      .api
      .delete_todo(id, credential)
      .await
      .inspect_err(|err| {
        warn!(error = %err, "delete todo failed");
      })?;
    self.after_write(DELETED_MESSAGE);
    Ok(())
  }

  fn after_write(&self, message: &str) {
    self.cache.lock().invalidate_all();
    self.notifier.success(message);
  }
}

impl<A> std::fmt::Debug for TodoStore<A> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    f.debug_struct("TodoStore")
      .field(
        "cached_lists",
        &self.cache.lock().len()
      )
      .field("notifier", &self.notifier)
      .finish()
  }
}
