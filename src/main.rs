//! Telegram Auto Texter - Main Entry Point
//!
//! A Telegram userbot that sends scheduled greetings, media and reminders
//! to a configured chat, driven by YAML schedule and catalog files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use telegram_auto_texter::commands::CommandHandler;
use telegram_auto_texter::config::{
    BotSettings, MediaCatalog, ScheduleConfig, StickerCatalog, TelegramConfig,
};
use telegram_auto_texter::registry::Registry;
use telegram_auto_texter::scheduler::{
    entries_for, Dispatcher, DispatcherMessage, SchedulerState, SendActions,
};
use telegram_auto_texter::telegram::{
    ChatRef, Messenger, TelegramBot, TelegramError, Update,
};

/// Telegram userbot for scheduled greetings, media and reminders.
#[derive(Parser, Debug)]
#[command(name = "auto_texter")]
#[command(about = "Send scheduled Telegram messages to a configured chat")]
#[command(version)]
struct Args {
    /// Directory holding schedule.yaml, media.yaml, stickers.yaml,
    /// register.yaml and the media files.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level for the console sink (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory the debug log file is written to.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Generate example configuration files and exit.
    #[arg(long)]
    generate_config: bool,
}

/// The YAML documents and media directory inside the data directory.
#[derive(Debug, Clone)]
struct DataPaths {
    schedule: PathBuf,
    media_catalog: PathBuf,
    sticker_catalog: PathBuf,
    register: PathBuf,
    media_dir: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        Self {
            schedule: data_dir.join("schedule.yaml"),
            media_catalog: data_dir.join("media.yaml"),
            sticker_catalog: data_dir.join("stickers.yaml"),
            register: data_dir.join("register.yaml"),
            media_dir: data_dir.join("media"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, &args.log_dir)?;

    let paths = DataPaths::new(&args.data_dir);

    if args.generate_config {
        return generate_example_config(&args.data_dir, &paths);
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let settings = BotSettings::from_env_with_defaults();

    let schedule = ScheduleConfig::load_from_file(&paths.schedule)
        .context("Failed to load schedule configuration")?;
    schedule
        .validate()
        .context("Schedule configuration validation failed")?;

    let media = MediaCatalog::load_from_file(&paths.media_catalog)
        .context("Failed to load media catalog")?;
    media.validate().context("Media catalog validation failed")?;

    let stickers = StickerCatalog::load_from_file(&paths.sticker_catalog)
        .context("Failed to load sticker catalog")?;
    stickers
        .validate()
        .context("Sticker catalog validation failed")?;

    let recipient_schedule = schedule
        .recipient_schedule()
        .context("Schedule has no usable recipient")?
        .clone();
    let recipient = recipient_schedule.chat_ref();

    let registry = Registry::load(&paths.register).context("Failed to load send registry")?;

    info!(
        "Loaded configuration: recipient '{}', {} morning / {} afternoon media, {} stickers",
        schedule.recipient,
        media.morning_media.len(),
        media.afternoon_media.len(),
        stickers.morning_stickers.len()
    );

    // Connect to Telegram
    let bot = TelegramBot::connect(&tg_config, settings.min_send_interval_secs)
        .await
        .context("Failed to connect to Telegram")?;

    // Handle authentication if needed
    if !bot
        .is_authorized()
        .await
        .context("Failed to check authorization")?
    {
        authenticate(&bot).await?;
    }

    let bot = Arc::new(bot);
    let state = Arc::new(RwLock::new(SchedulerState::new()));
    let registry = Arc::new(RwLock::new(registry));
    let media = Arc::new(media);

    let actions = Arc::new(
        SendActions::new(
            Arc::clone(&bot) as Arc<dyn Messenger>,
            Arc::clone(&media),
            Arc::new(stickers),
            Arc::clone(&registry),
            paths.media_dir.clone(),
        )
        .with_selection_order(settings.selection_order)
        .with_depletion_policy(settings.depletion_policy),
    );

    let handler = CommandHandler::new(
        Arc::clone(&state),
        Arc::clone(&registry),
        Arc::clone(&media),
        Arc::clone(&actions),
        recipient,
    );

    let entries = entries_for(&recipient_schedule);
    if entries.is_empty() {
        warn!("Recipient has no scheduled sends configured; only commands will work");
    }

    let dispatcher = Dispatcher::new(
        actions,
        entries,
        recipient,
        recipient_schedule.pills_reminder.clone(),
        Arc::clone(&state),
    )
    .with_poll_interval(Duration::from_secs(settings.poll_interval_secs.max(1)));

    dispatcher.prime().await;

    let (dispatcher_tx, dispatcher_rx) = mpsc::channel::<DispatcherMessage>(32);
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_rx).await;
    });

    info!("Auto texter is running. Use Ctrl+C to stop.");

    // Command handling and pill-reminder stop, interleaved with shutdown.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            update = bot.next_update() => {
                match update {
                    Ok(update) => handle_update(update, &bot, &handler, &state, recipient).await,
                    Err(e) => {
                        warn!("Update stream error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    // Cleanup
    info!("Shutting down...");
    let _ = dispatcher_tx.send(DispatcherMessage::Shutdown).await;
    let _ = dispatcher_handle.await;
    bot.disconnect();

    Ok(())
}

/// Reacts to one Telegram update: commands from the account owner, and
/// incoming messages from the recipient (which stop the pill reminder).
async fn handle_update(
    update: Update,
    bot: &Arc<TelegramBot>,
    handler: &CommandHandler,
    state: &Arc<RwLock<SchedulerState>>,
    recipient: ChatRef,
) {
    let Update::NewMessage(message) = update else {
        return;
    };

    // Any message from the recipient stops an active reminder loop.
    if !message.outgoing() && message.chat().id() == recipient.chat_id {
        let mut state = state.write().await;
        if state.pill_reminder_active {
            info!("Recipient replied, stopping pill reminder");
            state.pill_reminder_active = false;
        }
        return;
    }

    // Commands are messages the account owner typed in a private chat.
    if !message.outgoing() || !message.text().starts_with('/') {
        return;
    }

    let packed = message.chat().pack();
    let origin = ChatRef {
        chat_id: packed.id,
        access_hash: packed.access_hash,
    };

    if let Some(result) = handler.try_handle(message.text(), origin).await {
        if let Err(e) = bot.send_text(origin, &result.message).await {
            warn!("Failed to reply to command: {}", e);
        }
    }
}

/// Initializes logging: a concise console sink at the configured level and
/// a detailed daily-rolling file sink at debug level with source locations.
fn init_logging(level: &str, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "auto_texter.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(console_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_file(true)
                .with_line_number(true)
                .with_filter(EnvFilter::new("debug")),
        )
        .init();

    Ok(guard)
}

/// Generates example configuration files.
fn generate_example_config(data_dir: &Path, paths: &DataPaths) -> Result<()> {
    std::fs::create_dir_all(&paths.media_dir)
        .with_context(|| format!("Failed to create {}", paths.media_dir.display()))?;

    ScheduleConfig::example().save_to_file(&paths.schedule)?;
    MediaCatalog::example().save_to_file(&paths.media_catalog)?;
    StickerCatalog::example().save_to_file(&paths.sticker_catalog)?;

    println!("✓ Example configuration written to: {}", data_dir.display());
    println!("\nTo use this bot:");
    println!("1. Edit schedule.yaml with your recipient's chat id and send times");
    println!("2. List your files in media.yaml and stickers.yaml and put them in media/");
    println!("3. Create a .env file with TG_API_ID and TG_API_HASH");
    println!("4. Run: auto_texter");

    Ok(())
}

/// Handles Telegram authentication.
async fn authenticate(bot: &TelegramBot) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = bot
        .request_login_code(&phone)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match bot.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");
            info!("Password hint: {:?}", password_token.hint());

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            bot.check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
