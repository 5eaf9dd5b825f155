use anyhow::{Context, anyhow};
use chrono::Utc;
use todoboard_shared::{Todo, TodoId, TodoListResult, TodoStatus, UpsertTodo};
use tracing::{debug, info, instrument};

use crate::api::TodoApi;
use crate::board::{Board, CardEdit, DragEnd, DragLocation, apply_drag_end, edit_payload};
use crate::cli::Command;
use crate::datetime::parse_due_input;
use crate::filter::TodoFilter;
use crate::render::Renderer;
use crate::session::{AccessToken, BoardAccess, SessionState, TokenStore, board_access};
use crate::store::{ListState, TodoStore};

const SIGN_IN_HINT: &str =
    "Please sign in to manage your todos (run `todoboard login <token>`).";

/// Everything a command needs, built once per invocation.
pub struct CommandContext<'a, A> {
    pub store: &'a TodoStore<A>,
    pub tokens: &'a TokenStore,
    pub renderer: &'a Renderer,
}

#[instrument(skip(ctx, command))]
pub async fn dispatch<A: TodoApi>(ctx: &CommandContext<'_, A>, command: Command) -> anyhow::Result<()> {
    let credential = ctx.tokens.load()?;
    debug!(
        command = ?command,
        authenticated = credential.is_some(),
        "dispatching command"
    );

    match command {
        Command::Login { token } => cmd_login(ctx, &token),
        Command::Logout => cmd_logout(ctx),
        Command::List { terms } => cmd_list(ctx, &terms, credential.as_ref()).await,
        Command::Board { terms } => cmd_board(ctx, &terms, credential.as_ref()).await,
        Command::Add {
            title,
            description,
            status,
            due,
            tags,
        } => {
            let status: TodoStatus = status
                .parse()
                .with_context(|| format!("invalid status: {status}"))?;
            let mut payload = UpsertTodo::new(title.join(" "), status);
            payload.description = description.filter(|d| !d.is_empty());
            payload.due_date = due
                .as_deref()
                .map(|raw| parse_due_input(raw, Utc::now()))
                .transpose()?;
            payload.tags = tags;
            cmd_add(ctx, &payload, credential.as_ref()).await
        }
        Command::Edit {
            id,
            title,
            description,
            due,
            clear_due,
        } => {
            let todo = require_todo(ctx, &TodoId::new(id), credential.as_ref()).await?;
            let mut edit = CardEdit::from_todo(&todo);
            if let Some(title) = title {
                edit.title = title;
            }
            if let Some(description) = description {
                edit.description = description;
            }
            if clear_due {
                edit.due_date = None;
            } else if let Some(raw) = due {
                edit.due_date = Some(parse_due_input(&raw, Utc::now())?);
            }
            let payload = edit_payload(&todo, edit);
            let updated = ctx.store.update_todo(&payload, credential.as_ref()).await?;
            ctx.renderer.print_todo_info(&updated)
        }
        Command::Delete { id } => {
            ctx.store
                .delete_todo(&TodoId::new(id), credential.as_ref())
                .await?;
            Ok(())
        }
        Command::Move { id, status } => cmd_move(ctx, &TodoId::new(id), &status, credential.as_ref()).await,
    }
}

fn cmd_login<A>(ctx: &CommandContext<'_, A>, raw: &str) -> anyhow::Result<()> {
    let token = AccessToken::new(raw).ok_or_else(|| anyhow!("access token cannot be empty"))?;
    ctx.tokens.save(&token)?;
    println!("Signed in; token stored at {}", ctx.tokens.path().display());
    Ok(())
}

fn cmd_logout<A>(ctx: &CommandContext<'_, A>) -> anyhow::Result<()> {
    if ctx.tokens.clear()? {
        println!("Signed out.");
    } else {
        println!("No stored token.");
    }
    Ok(())
}

async fn cmd_list<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    terms: &[String],
    credential: Option<&AccessToken>,
) -> anyhow::Result<()> {
    let filter = TodoFilter::parse(terms, Utc::now())?;
    let Some(result) = load_list(ctx, &filter, credential).await? else {
        return Ok(());
    };
    ctx.renderer.print_todo_table(&result, Utc::now())
}

async fn cmd_board<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    terms: &[String],
    credential: Option<&AccessToken>,
) -> anyhow::Result<()> {
    let filter = TodoFilter::parse(terms, Utc::now())?;
    let Some(result) = load_list(ctx, &filter, credential).await? else {
        return Ok(());
    };
    let board = Board::from_todos(&result.todos);
    ctx.renderer.print_board(&board)
}

async fn cmd_add<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    payload: &UpsertTodo,
    credential: Option<&AccessToken>,
) -> anyhow::Result<()> {
    let created = ctx.store.create_todo(payload, credential).await?;
    info!(id = %created.id, "created todo");
    ctx.renderer.print_todo_info(&created)
}

/// A move is a drag from the todo's current slot to the top of the target
/// column, so it follows the same rules as a drop on the board.
async fn cmd_move<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    id: &TodoId,
    column: &str,
    credential: Option<&AccessToken>,
) -> anyhow::Result<()> {
    let status: TodoStatus = column
        .parse()
        .with_context(|| format!("invalid status: {column}"))?;
    let filter = TodoFilter::default();
    let Some(result) = load_list(ctx, &filter, credential).await? else {
        return Ok(());
    };
    let board = Board::from_todos(&result.todos);
    let source = board
        .locate(id)
        .ok_or_else(|| anyhow!("todo {id} is not on the board"))?;
    let event = DragEnd {
        draggable_id: id.clone(),
        source,
        destination: Some(DragLocation::new(status.as_str(), 0)),
    };

    match apply_drag_end(ctx.store, &event, &result.todos, credential).await? {
        Some(updated) => ctx.renderer.print_todo_info(&updated),
        None => {
            println!("No change for todo {id}.");
            Ok(())
        }
    }
}

async fn require_todo<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    id: &TodoId,
    credential: Option<&AccessToken>,
) -> anyhow::Result<Todo> {
    let result = load_list(ctx, &TodoFilter::default(), credential)
        .await?
        .ok_or_else(|| anyhow!("sign in before editing todos"))?;
    result
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow!("todo {id} is not in the current list"))
}

/// Reads a list behind the access gate. `None` means the sign-in hint was
/// shown instead.
async fn load_list<A: TodoApi>(
    ctx: &CommandContext<'_, A>,
    filter: &TodoFilter,
    credential: Option<&AccessToken>,
) -> anyhow::Result<Option<TodoListResult>> {
    let access = board_access(false, credential.is_some(), SessionState::default());
    if access == BoardAccess::SignInRequired {
        println!("{SIGN_IN_HINT}");
        return Ok(None);
    }

    match ctx.store.list_todos(filter, credential).await {
        Ok(ListState::Ready(result)) => Ok(Some(result)),
        Ok(ListState::Disabled) => {
            println!("{SIGN_IN_HINT}");
            Ok(None)
        }
        Err(err) if err.is_unauthorized() => {
            println!("{SIGN_IN_HINT}");
            Ok(None)
        }
        Err(err) => Err(err).context("failed to load todos"),
    }
}
