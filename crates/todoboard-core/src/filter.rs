use std::collections::BTreeMap;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde_json::Value;
use todoboard_shared::TodoStatus;
use tracing::trace;

use crate::datetime::{
  end_of_day,
  format_query_date,
  format_query_timestamp,
  parse_calendar_date
};

/// Query-time projection over the
/// remote todo list. Never persisted.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TodoFilter {
  pub status:    Option<TodoStatus>,
  pub search:    Option<String>,
  pub tag:       Option<String>,
  pub page:      Option<u64>,
  pub limit:     Option<u64>,
  pub due_start: Option<NaiveDate>,
  pub due_end:   Option<NaiveDate>,
  pub extra:     BTreeMap<String, String>
}

/// Identity of a list read in the
/// query cache.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub struct QueryKey(String);

impl QueryKey {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl TodoFilter {
  /// Parses command-line filter terms.
  ///
  /// `+tag`, `status:S`, `due.after:D`,
  /// `due.before:D`, `page:N`, `limit:N`
  /// and `search:TEXT` are recognised;
  /// any other `key:value` is passed
  /// through as a free-form filter and
  /// bare words join into `search`.
  #[tracing::instrument(skip(
    terms, now
  ))]
  pub fn parse(
    terms: &[String],
    now: DateTime<Utc>
  ) -> anyhow::Result<Self> {
    let mut filter = Self::default();
    let mut words = Vec::new();

    for raw in terms {
      let term = raw.trim();
      if term.is_empty() {
        continue;
      }

      if let Some(tag) =
        term.strip_prefix('+')
      {
        if tag.is_empty() {
          return Err(anyhow!(
            "empty tag filter"
          ));
        }
        filter.tag = Some(tag.to_string());
        continue;
      }

      let Some((key, value)) =
        term.split_once(':')
      else {
        words.push(term.to_string());
        continue;
      };

      trace!(key, value, "filter term");
      match key {
        | "status" => {
          filter.status = Some(
            value.parse().with_context(
              || {
                format!(
                  "invalid status \
                   filter: {value}"
                )
              }
            )?
          );
        }
        | "due.after" | "dueStart" => {
          filter.due_start = Some(
            parse_calendar_date(value, now)?
          );
        }
        | "due.before" | "dueEnd" => {
          filter.due_end = Some(
            parse_calendar_date(value, now)?
          );
        }
        | "page" => {
          filter.page =
            Some(parse_number(key, value)?);
        }
        | "limit" => {
          filter.limit =
            Some(parse_number(key, value)?);
        }
        | "search" => {
          words.push(value.to_string());
        }
        | "" => {
          return Err(anyhow!(
            "filter term has empty key: \
             {term}"
          ));
        }
        | other => {
          filter.extra.insert(
            other.to_string(),
            value.to_string()
          );
        }
      }
    }

    if !words.is_empty() {
      filter.search = Some(words.join(" "));
    }
    Ok(filter)
  }

  /// Query parameters in a stable
  /// order. `dueStart` is a calendar
  /// date; `dueEnd` is the last
  /// millisecond of its day.
  pub fn to_query_params(
    &self
  ) -> anyhow::Result<Vec<(String, String)>>
  {
    let mut params = BTreeMap::new();

    for (key, value) in &self.extra {
      params.insert(
        key.clone(),
        value.clone()
      );
    }
    if let Some(status) = self.status {
      params.insert(
        "status".to_string(),
        status.as_str().to_string()
      );
    }
    if let Some(search) = &self.search {
      params.insert(
        "search".to_string(),
        search.clone()
      );
    }
    if let Some(tag) = &self.tag {
      params.insert(
        "tag".to_string(),
        tag.clone()
      );
    }
    if let Some(page) = self.page {
      params.insert(
        "page".to_string(),
        page.to_string()
      );
    }
    if let Some(limit) = self.limit {
      params.insert(
        "limit".to_string(),
        limit.to_string()
      );
    }
    if let Some(start) = self.due_start {
      params.insert(
        "dueStart".to_string(),
        format_query_date(start)
      );
    }
    if let Some(end) = self.due_end {
      params.insert(
        "dueEnd".to_string(),
        format_query_timestamp(
          end_of_day(end)?
        )
      );
    }

    Ok(params.into_iter().collect())
  }

  pub fn cache_key(
    &self
  ) -> anyhow::Result<QueryKey> {
    let params = self.to_query_params()?;
    Ok(query_key(&params))
  }
}

/// Cache key for a list read. Pairs are
/// JSON-encoded so separators inside
/// values cannot merge two filters.
pub fn query_key(
  params: &[(String, String)]
) -> QueryKey {
  let pairs = params
    .iter()
    .map(|(k, v)| {
      Value::Array(vec![
        Value::from(k.as_str()),
        Value::from(v.as_str()),
      ])
    })
    .collect();
  QueryKey(format!(
    "todos:{}",
    Value::Array(pairs)
  ))
}

fn parse_number(
  key: &str,
  value: &str
) -> anyhow::Result<u64> {
  value.trim().parse().with_context(
    || {
      format!(
        "invalid {key} filter: {value}"
      )
    }
  )
}
