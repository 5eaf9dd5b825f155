use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "todoboard-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TODOBOARD_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TODOBOARD_TIME_CONFIG";

/// Calendar-date format used for
/// `dueStart`.
pub const QUERY_DATE_FORMAT: &str =
  "%Y-%m-%d";
/// ISO-8601 with milliseconds and a
/// literal `Z`, used for `dueEnd`.
pub const QUERY_TIMESTAMP_FORMAT: &str =
  "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Timezone that defines where a
/// calendar day starts and ends.
pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

#[must_use]
pub fn format_query_date(
  date: NaiveDate
) -> String {
  date
    .format(QUERY_DATE_FORMAT)
    .to_string()
}

#[must_use]
pub fn format_query_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.format(QUERY_TIMESTAMP_FORMAT)
    .to_string()
}

/// Last millisecond of `date` in the
/// project timezone.
pub fn end_of_day(
  date: NaiveDate
) -> anyhow::Result<DateTime<Utc>> {
  end_of_day_in(
    date,
    project_timezone()
  )
}

pub fn end_of_day_in(
  date: NaiveDate,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  let last_ms =
    NaiveTime::from_hms_milli_opt(
      23, 59, 59, 999
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid end-of-day time"
      )
    })?;
  to_utc_from_local(
    tz,
    date.and_time(last_ms),
    "end of day"
  )
}

pub fn start_of_day_in(
  date: NaiveDate,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  to_utc_from_local(
    tz,
    date.and_time(NaiveTime::MIN),
    "start of day"
  )
}

#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[must_use]
pub fn format_project_date(
  dt: DateTime<Utc>
) -> String {
  format_query_date(to_project_date(dt))
}

/// Parses a calendar date typed by a
/// user: `today`, `tomorrow`,
/// `yesterday`, `+Nd` or `YYYY-MM-DD`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_calendar_date(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = to_project_date(now);

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "date cannot be empty"
      ));
    }
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(today + Duration::days(1));
    }
    | "yesterday" => {
      return Ok(today - Duration::days(1));
    }
    | _ => {}
  }

  if let Some(days) = lower
    .strip_prefix('+')
    .and_then(|rest| {
      rest.strip_suffix('d')
    })
  {
    let days: i64 =
      days.parse().with_context(|| {
        format!(
          "invalid day offset: {token}"
        )
      })?;
    return Duration::try_days(days)
      .and_then(|offset| {
        today.checked_add_signed(offset)
      })
      .ok_or_else(|| {
        anyhow!(
          "day offset out of range: \
           {token}"
        )
      });
  }

  NaiveDate::parse_from_str(
    token,
    QUERY_DATE_FORMAT
  )
  .with_context(|| {
    format!(
      "unrecognized date: {token}"
    )
  })
}

/// Parses a due date. Accepts anything
/// [`parse_calendar_date`] does (as
/// start of that day) or a full
/// RFC 3339 timestamp.
pub fn parse_due_input(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(
      input.trim()
    )
  {
    return Ok(dt.with_timezone(&Utc));
  }
  let date =
    parse_calendar_date(input, now)?;
  start_of_day_in(
    date,
    project_timezone()
  )
}

fn to_utc_from_local(
  tz: &Tz,
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using latest"
      );
      let chosen = if first >= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  tracing::debug!(
    "no project timezone configured; \
     using UTC"
  );
  chrono_tz::UTC
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}
