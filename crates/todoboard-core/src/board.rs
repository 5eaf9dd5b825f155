use std::collections::BTreeMap;

use chrono::{
  DateTime,
  Utc
};
use todoboard_shared::{
  Todo,
  TodoId,
  TodoStatus,
  UpsertTodo
};
use tracing::{
  debug,
  instrument,
  warn
};

use crate::api::TodoApi;
use crate::error::StoreResult;
use crate::session::AccessToken;
use crate::store::TodoStore;

/// A column and a position within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragLocation {
  pub column_id: String,
  pub index:     usize
}

impl DragLocation {
  pub fn new(
    column_id: impl Into<String>,
    index: usize
  ) -> Self {
    Self {
      column_id: column_id.into(),
      index
    }
  }
}

/// Terminal event of a drag. An absent
/// destination means the card was
/// dropped outside any column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
  pub draggable_id: TodoId,
  pub source:       DragLocation,
  pub destination:  Option<DragLocation>
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum IgnoreReason {
  NoDestination,
  SameSlot,
  UnknownColumn,
  NotFound,
  StatusUnchanged
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropDecision {
  Ignore(IgnoreReason),
  Update(UpsertTodo)
}

/// Decides what a drag-end means for
/// the todos currently on the board.
///
/// Only the destination column matters;
/// ordering inside a column is not
/// persisted, so moving within a column
/// never produces an update.
pub fn reconcile(
  event: &DragEnd,
  todos: &[Todo]
) -> DropDecision {
  let Some(destination) =
    event.destination.as_ref()
  else {
    return DropDecision::Ignore(
      IgnoreReason::NoDestination
    );
  };

  if *destination == event.source {
    return DropDecision::Ignore(
      IgnoreReason::SameSlot
    );
  }

  let Ok(new_status) = destination
    .column_id
    .parse::<TodoStatus>()
  else {
    warn!(
      column = %destination.column_id,
      "drop on unknown column ignored"
    );
    return DropDecision::Ignore(
      IgnoreReason::UnknownColumn
    );
  };

  let Some(todo) = todos.iter().find(
    |todo| todo.id == event.draggable_id
  ) else {
    debug!(
      id = %event.draggable_id,
      "dragged todo is not in the current list"
    );
    return DropDecision::Ignore(
      IgnoreReason::NotFound
    );
  };

  if todo.status == new_status {
    return DropDecision::Ignore(
      IgnoreReason::StatusUnchanged
    );
  }

  let mut payload =
    UpsertTodo::from_todo(todo);
  payload.status = new_status;
  DropDecision::Update(payload)
}

/// Applies a drag-end: at most one
/// update request, none for an ignored
/// drop. Returns the updated todo when a
/// request was made.
#[instrument(skip(store, todos, credential), fields(id = %event.draggable_id))]
pub async fn apply_drag_end<A: TodoApi>(
  store: &TodoStore<A>,
  event: &DragEnd,
  todos: &[Todo],
  credential: Option<&AccessToken>
) -> StoreResult<Option<Todo>> {
  match reconcile(event, todos) {
    | DropDecision::Ignore(reason) => {
      debug!(?reason, "drag produced no change");
      Ok(None)
    }
    | DropDecision::Update(payload) => {
      debug!(
        status = %payload.status,
        "drag changes todo status"
      );
      store
        .update_todo(&payload, credential)
        .await
        .map(Some)
    }
  }
}

/// Fields editable on a board card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardEdit {
  pub title:       String,
  pub description: String,
  pub due_date:    Option<DateTime<Utc>>
}

impl CardEdit {
  /// Editor state seeded from `todo`.
  pub fn from_todo(todo: &Todo) -> Self {
    Self {
      title:       todo.title.clone(),
      description: todo
        .description
        .clone()
        .unwrap_or_default(),
      due_date:    todo.due_date
    }
  }
}

/// Update payload for a saved card
/// edit. Status and tags stay as they
/// are; a blank description is dropped.
pub fn edit_payload(
  todo: &Todo,
  edit: CardEdit
) -> UpsertTodo {
  let description =
    if edit.description.is_empty() {
      None
    } else {
      Some(edit.description)
    };
  UpsertTodo {
    id: Some(todo.id.clone()),
    title: edit.title,
    description,
    status: todo.status,
    due_date: edit.due_date,
    tags: todo.tags.clone()
  }
}

/// Todos grouped into one column per
/// status, in list order.
#[derive(Debug, Clone, Default)]
pub struct Board<'a> {
  columns: BTreeMap<TodoStatus, Vec<&'a Todo>>
}

impl<'a> Board<'a> {
  pub fn from_todos(
    todos: &'a [Todo]
  ) -> Self {
    let mut columns: BTreeMap<
      TodoStatus,
      Vec<&'a Todo>
    > = TodoStatus::ALL
      .into_iter()
      .map(|status| (status, Vec::new()))
      .collect();
    for todo in todos {
      columns
        .entry(todo.status)
        .or_default()
        .push(todo);
    }
    Self { columns }
  }

  pub fn column(
    &self,
    status: TodoStatus
  ) -> &[&'a Todo] {
    self
      .columns
      .get(&status)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn count(
    &self,
    status: TodoStatus
  ) -> usize {
    self.column(status).len()
  }

  /// Columns in display order.
  pub fn columns(
    &self
  ) -> impl Iterator<Item = (TodoStatus, &[&'a Todo])>
  {
    TodoStatus::ALL
      .into_iter()
      .map(|status| {
        (status, self.column(status))
      })
  }

  /// Where `id` currently sits, as a
  /// drag source.
  pub fn locate(
    &self,
    id: &TodoId
  ) -> Option<DragLocation> {
    self.columns().find_map(
      |(status, cards)| {
        cards
          .iter()
          .position(|todo| &todo.id == id)
          .map(|index| {
            DragLocation::new(
              status.as_str(),
              index
            )
          })
      }
    )
  }
}
