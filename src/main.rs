use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use question_bot::core::export::CsvReportGenerator;
use question_bot::core::{config, init_logger, AppError};
use question_bot::dispatch::intake::{IntakeConfig, QuestionIntake};
use question_bot::dispatch::{PendingStore, Router, RouterDeps};
use question_bot::storage::{create_pool, SqliteStore};
use question_bot::telegram::{
    create_bot, listener, register_all, setup_bot_commands, HandlerDeps, TelegramErrorNotifier, TelegramGateway,
};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Log panics from any task before the runtime unwinds them
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let pool = create_pool(&config::DATABASE_PATH)?;
    log::info!("Database ready at {}", config::DATABASE_PATH.as_str());

    let bot = create_bot(&config::BOT_TOKEN)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let store = Arc::new(SqliteStore::new(pool));

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let messenger = Arc::new(TelegramGateway::new(bot.clone()));
    let notifier = Arc::new(TelegramErrorNotifier::new(messenger.clone()));
    let reports = Arc::new(CsvReportGenerator::new(config::EXPORT_DIR.as_str()));
    let pending = Arc::new(PendingStore::new());

    let (intake, intake_task) = QuestionIntake::start(
        store.clone(),
        messenger.clone(),
        IntakeConfig {
            workers: config::questions::WORKERS,
            capacity: config::questions::QUEUE_CAPACITY,
            job_timeout: config::dispatch::update_timeout(),
        },
        shutdown.clone(),
    );

    let mut router = Router::new(RouterDeps {
        users: store.clone(),
        messenger: messenger.clone(),
        notifier,
        pending: pending.clone(),
        intake,
        update_timeout: config::dispatch::update_timeout(),
    });
    let deps = HandlerDeps::new(
        store.clone(),
        store,
        messenger,
        reports,
        pending,
        &config::CHANNEL_URL,
    );
    register_all(&mut router, &deps)?;

    let (tx, rx) = mpsc::channel(config::dispatch::UPDATE_BUFFER);
    let listener_task = tokio::spawn(listener::run(bot, tx, shutdown.clone()));

    log::info!("================================================");
    log::info!("Ready to receive updates!");
    log::info!("================================================");

    let reason = Arc::new(router).run(rx, shutdown.clone()).await;
    shutdown.cancel();

    if let Err(e) = listener_task.await {
        log::warn!("Listener task failed: {}", e);
    }
    if let Err(e) = intake_task.await {
        log::warn!("Question intake task failed: {}", e);
    }

    match reason {
        AppError::Cancelled => {
            log::info!("Bot shutdown gracefully");
            Ok(())
        }
        other => Err(other.into()),
    }
}

/// Cancels `shutdown` on Ctrl-C or SIGTERM
async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }

    log::info!("Shutting down gracefully...");
    shutdown.cancel();
}
