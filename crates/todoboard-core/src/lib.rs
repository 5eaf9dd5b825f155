pub mod api;
pub mod board;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod notify;
pub mod render;
pub mod session;
pub mod store;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::{
  StoreError,
  StoreResult
};
pub use notify::Notifier;
pub use store::{
  ListState,
  TodoStore
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting todoboard CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;
  let tokens =
    session::TokenStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open token store \
           at {}",
          data_dir.display()
        )
      })?;

  let settings = cfg.api_settings()?;
  let api =
    api::HttpTodoApi::new(&settings)
      .context(
        "failed to build todo API \
         client"
      )?;

  let renderer =
    render::Renderer::new(&cfg)?;

  // Toasts go to stderr so list output
  // stays pipeable.
  let notifier = Notifier::new();
  let toast_renderer = renderer.clone();
  notifier.register(
    move |text, severity| {
      eprintln!(
        "{}",
        toast_renderer
          .notification_line(
            text, severity
          )
      );
    }
  );

  let store =
    TodoStore::new(api, notifier);
  let ctx = commands::CommandContext {
    store:    &store,
    tokens:   &tokens,
    renderer: &renderer
  };

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &ctx,
    cli.command
  ))?;

  info!("done");
  Ok(())
}
