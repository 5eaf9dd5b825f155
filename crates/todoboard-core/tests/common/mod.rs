#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use todoboard_core::api::TodoApi;
use todoboard_core::session::AccessToken;
use todoboard_core::{Notifier, StoreError, StoreResult};
use todoboard_shared::{Severity, Todo, TodoId, TodoListResult, TodoStatus, UpsertTodo};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(Vec<(String, String)>),
    Create(UpsertTodo),
    Update(TodoId, UpsertTodo),
    Delete(TodoId),
}

/// In-memory API that records every request it receives.
#[derive(Default)]
pub struct RecordingApi {
    pub calls: Mutex<Vec<Call>>,
    pub todos: Mutex<Vec<Todo>>,
    pub fail_writes: AtomicBool,
}

impl RecordingApi {
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos: Mutex::new(todos),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn write_result(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                method: "TEST",
                url: "memory://todos".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

fn todo_from(id: TodoId, payload: &UpsertTodo) -> Todo {
    Todo {
        id,
        title: payload.title.clone(),
        description: payload.description.clone(),
        status: payload.status,
        due_date: payload.due_date,
        tags: payload.tags.clone(),
        created_at: None,
        updated_at: None,
    }
}

#[async_trait]
impl TodoApi for RecordingApi {
    async fn list_todos(
        &self,
        params: &[(String, String)],
        _token: &AccessToken,
    ) -> StoreResult<TodoListResult> {
        self.calls.lock().push(Call::List(params.to_vec()));
        let todos = self.todos.lock().clone();
        Ok(TodoListResult {
            total: todos.len() as u64,
            page: 1,
            limit: 20,
            total_pages: 1,
            todos,
        })
    }

    async fn create_todo(
        &self,
        payload: &UpsertTodo,
        _token: Option<&AccessToken>,
    ) -> StoreResult<Todo> {
        self.calls.lock().push(Call::Create(payload.clone()));
        self.write_result()?;
        let id = TodoId::new(format!("t{}", self.todos.lock().len() + 1));
        let todo = todo_from(id, payload);
        self.todos.lock().push(todo.clone());
        Ok(todo)
    }

    async fn update_todo(
        &self,
        id: &TodoId,
        payload: &UpsertTodo,
        _token: Option<&AccessToken>,
    ) -> StoreResult<Todo> {
        self.calls
            .lock()
            .push(Call::Update(id.clone(), payload.clone()));
        self.write_result()?;
        let todo = todo_from(id.clone(), payload);
        let mut todos = self.todos.lock();
        if let Some(slot) = todos.iter_mut().find(|t| &t.id == id) {
            *slot = todo.clone();
        }
        Ok(todo)
    }

    async fn delete_todo(&self, id: &TodoId, _token: Option<&AccessToken>) -> StoreResult<()> {
        self.calls.lock().push(Call::Delete(id.clone()));
        self.write_result()?;
        self.todos.lock().retain(|t| &t.id != id);
        Ok(())
    }
}

pub fn todo(id: &str, status: TodoStatus) -> Todo {
    Todo {
        id: TodoId::from(id),
        title: format!("Todo {id}"),
        description: Some(format!("about {id}")),
        status,
        due_date: None,
        tags: vec!["board".to_string()],
        created_at: None,
        updated_at: None,
    }
}

pub fn token() -> AccessToken {
    AccessToken::new("test-token").expect("token")
}

pub type Toasts = Arc<Mutex<Vec<(String, Severity)>>>;

pub fn record_toasts(notifier: &Notifier) -> Toasts {
    let seen: Toasts = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    notifier.register(move |text, severity| {
        sink.lock().push((text.to_string(), severity));
    });
    seen
}
