use std::collections::HashMap;

use todoboard_shared::TodoListResult;
use tracing::debug;

use crate::filter::QueryKey;

#[derive(Debug, Clone)]
struct Entry {
  result: TodoListResult,
  stale:  bool
}

/// List results keyed by the exact
/// query that produced them.
///
/// Writes invalidate every entry at
/// once; entries are replaced wholesale
/// by the next fetch.
#[derive(Debug, Default)]
pub struct QueryCache {
  entries:       HashMap<QueryKey, Entry>,
  invalidations: u64
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cached result for `key` unless it
  /// has been invalidated.
  pub fn fresh(
    &self,
    key: &QueryKey
  ) -> Option<TodoListResult> {
    self
      .entries
      .get(key)
      .filter(|entry| !entry.stale)
      .map(|entry| entry.result.clone())
  }

  /// Cached result for `key`, stale or
  /// not.
  pub fn last_known(
    &self,
    key: &QueryKey
  ) -> Option<&TodoListResult> {
    self
      .entries
      .get(key)
      .map(|entry| &entry.result)
  }

  pub fn store(
    &mut self,
    key: QueryKey,
    result: TodoListResult
  ) {
    debug!(
      key = key.as_str(),
      todos = result.todos.len(),
      "caching todo list"
    );
    self.entries.insert(key, Entry {
      result,
      stale: false
    });
  }

  pub fn invalidate_all(&mut self) {
    for entry in self.entries.values_mut()
    {
      entry.stale = true;
    }
    self.invalidations += 1;
    debug!(
      entries = self.entries.len(),
      invalidations = self.invalidations,
      "invalidated todo lists"
    );
  }

  pub fn invalidations(&self) -> u64 {
    self.invalidations
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
