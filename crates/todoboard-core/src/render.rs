use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use todoboard_shared::{Severity, Todo, TodoListResult, TodoStatus};
use unicode_width::UnicodeWidthStr;

use crate::board::Board;
use crate::config::Config;
use crate::datetime::format_project_date;

const CARD_TEXT_WIDTH: usize = 28;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, result, now))]
    pub fn print_todo_table(
        &self,
        result: &TodoListResult,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Due".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(result.todos.len());
        for todo in &result.todos {
            let due = match todo.due_date {
                Some(due) if due < now && todo.status != TodoStatus::Completed => {
                    self.paint(&format_project_date(due), "31")
                }
                Some(due) => format_project_date(due),
                None => String::new(),
            };
            let tags = todo
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                self.paint(todo.id.as_str(), "33"),
                self.paint(&todo.status.label(), status_color(todo.status)),
                due,
                todo.title.clone(),
                tags,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "page {}/{} ({} todos, {} per page)",
            result.page, result.total_pages, result.total, result.limit
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, board))]
    pub fn print_board(&self, board: &Board<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = board
            .columns()
            .map(|(status, cards)| {
                self.paint(
                    &format!("{} ({})", status.label(), cards.len()),
                    status_color(status),
                )
            })
            .collect::<Vec<_>>();

        let depth = board
            .columns()
            .map(|(_, cards)| cards.len())
            .max()
            .unwrap_or(0);

        let mut rows = Vec::with_capacity(depth);
        for index in 0..depth {
            let row = board
                .columns()
                .map(|(_, cards)| {
                    cards
                        .get(index)
                        .map(|todo| card_line(todo))
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>();
            rows.push(row);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, todo))]
    pub fn print_todo_info(&self, todo: &Todo) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", todo.id)?;
        writeln!(out, "title       {}", todo.title)?;
        writeln!(out, "status      {}", todo.status.label())?;
        writeln!(
            out,
            "description {}",
            todo.description.clone().unwrap_or_default()
        )?;
        writeln!(out, "tags        {}", todo.tags.join(", "))?;
        if let Some(due) = todo.due_date {
            writeln!(out, "due         {}", format_project_date(due))?;
        }
        if let Some(created) = todo.created_at {
            writeln!(out, "created     {}", created.to_rfc3339())?;
        }
        if let Some(updated) = todo.updated_at {
            writeln!(out, "updated     {}", updated.to_rfc3339())?;
        }

        Ok(())
    }

    /// Toast line for a notification.
    pub fn notification_line(&self, text: &str, severity: Severity) -> String {
        let code = match severity {
            Severity::Success => "32",
            Severity::Info => "36",
            Severity::Warning => "33",
            Severity::Error => "31",
        };
        format!("[{}] {text}", self.paint(&severity.to_string(), code))
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn status_color(status: TodoStatus) -> &'static str {
    match status {
        TodoStatus::Completed => "32",
        TodoStatus::InProgress => "36",
        TodoStatus::Pending => "33",
        TodoStatus::Cancelled => "90",
    }
}

fn card_line(todo: &Todo) -> String {
    let mut line = format!("{} {}", todo.id, todo.title);
    if UnicodeWidthStr::width(line.as_str()) > CARD_TEXT_WIDTH {
        let mut clipped = String::new();
        for ch in line.chars() {
            let next = format!("{clipped}{ch}");
            if UnicodeWidthStr::width(next.as_str()) >= CARD_TEXT_WIDTH {
                break;
            }
            clipped = next;
        }
        clipped.push('…');
        line = clipped;
    }
    line
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        let visible_width = UnicodeWidthStr::width(strip_ansi(header).as_str());
        let padding = widths[idx].saturating_sub(visible_width);
        write!(writer, "{}{} ", header, " ".repeat(padding))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use todoboard_shared::{Todo, TodoId, TodoStatus};

    use super::{card_line, strip_ansi, write_table};

    #[test]
    fn table_pads_to_widest_cell() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Title".to_string()],
            vec![vec!["t10".to_string(), "x".to_string()]],
        )
        .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID  Title ");
        assert_eq!(lines[1], "--- ----- ");
        assert_eq!(lines[2], "t10 x     ");
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[33mt1\x1b[0m"), "t1");
    }

    #[test]
    fn long_card_titles_are_clipped() {
        let todo = Todo {
            id: TodoId::from("t1"),
            title: "a very long title that will not fit on a card".to_string(),
            description: None,
            status: TodoStatus::Pending,
            due_date: None,
            tags: vec![],
            created_at: None,
            updated_at: None,
        };
        let line = card_line(&todo);
        assert!(line.ends_with('…'));
        assert!(line.chars().count() <= 28);
    }
}
