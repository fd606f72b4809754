use std::{path::PathBuf, sync::Arc};

use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, eyre};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mmlink_client::{
    BackendApi, BackendService, ClientConfig, Mutation, Watcher,
    client::config::MessageQuery,
    config::{AppConfig, TokenStore, default_config_path, load_config},
    domain::{
        BroadcastRequest, MessageDirection, MessageDto, OverviewStats, Platform, UserPage,
        WebhookTarget, distinct_senders,
    },
    id::UserId,
    logging::{LoggingConfig, init_logging},
};

#[derive(Parser)]
#[command(name = "mmlink", version, about = "CLI for the MMLink messaging-bot backend")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check backend health
    Health,
    /// Show overview statistics
    Stats {
        /// Keep polling and print updates until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// List bot users
    Users {
        /// Restrict to one platform (viber or telegram)
        #[arg(long)]
        platform: Option<String>,
        /// Page size
        #[arg(long)]
        limit: Option<u32>,
        /// Listing offset
        #[arg(long)]
        offset: Option<u32>,
        /// Keep polling and print updates until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Show recent messages
    Messages {
        /// Show one user's conversation instead of the global feed
        #[arg(long)]
        user: Option<String>,
        /// Page size
        #[arg(long)]
        limit: Option<u32>,
        /// Keep polling and print updates until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Send a broadcast to all users
    Broadcast {
        /// Message text
        text: String,
        /// Restrict to one platform
        #[arg(long)]
        platform: Option<String>,
    },
    /// Register platform webhooks with Viber and Telegram
    SetupWebhooks,
    /// Store the backend bearer token
    Login { token: String },
    /// Remove the stored bearer token
    Logout,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let app_config = load_config(&config_path)?;

    let mut logging_config = LoggingConfig::from_env();
    if let Some(log_level) = &app_config.log_level
        && let Ok(level) = log_level.parse()
    {
        logging_config.file_level = level;
    }

    let (_log_guard, log_reload) = init_logging(logging_config)?;
    if cli.debug {
        log_reload
            .reload(EnvFilter::new("mmlink=debug,mmlink_client=debug"))
            .map_err(|e| eyre!("Failed to raise log level: {e}"))?;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "mmlink starting up");

    let token_store = TokenStore::new(TokenStore::default_path());

    match cli.command {
        Command::Login { token } => {
            token_store.save(&token)?;
            println!("Token stored");
            Ok(())
        },
        Command::Logout => {
            token_store.clear()?;
            println!("Token removed");
            Ok(())
        },
        Command::Health => {
            let (api, _) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            health(&api).await
        },
        Command::Stats { watch } => {
            let (_, service) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            stats(&service, watch).await
        },
        Command::Users { platform, limit, offset, watch } => {
            let (_, service) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            users(&service, platform.as_deref(), limit, offset, watch).await
        },
        Command::Messages { user, limit, watch } => {
            let (_, service) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            messages(&service, user.as_deref(), limit, watch).await
        },
        Command::Broadcast { text, platform } => {
            let (api, _) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            broadcast(&api, &text, platform.as_deref()).await
        },
        Command::SetupWebhooks => {
            let (api, _) = connect(app_config, cli.base_url.as_deref(), &token_store)?;
            setup_webhooks(&api).await
        },
    }
}

/// Build the API client and service from config, CLI overrides, and the
/// stored token
fn connect(
    app_config: AppConfig,
    base_url: Option<&str>,
    token_store: &TokenStore,
) -> color_eyre::Result<(Arc<BackendApi>, BackendService)> {
    let mut client_config = ClientConfig::from(app_config).with_auth_token(token_store.load()?);
    if let Some(base_url) = base_url {
        client_config.base_url = base_url.into();
    }

    let api = Arc::new(BackendApi::new(client_config)?);
    let service = BackendService::new(Arc::clone(&api));
    Ok((api, service))
}

async fn health(api: &BackendApi) -> color_eyre::Result<()> {
    let status = api.health_check().await?;
    println!(
        "{} ({}) at {}",
        status.status,
        status.environment,
        status.timestamp.with_timezone(&Local)
    );
    Ok(())
}

async fn stats(service: &BackendService, watch: bool) -> color_eyre::Result<()> {
    if watch {
        return watch_states(service.watch_overview_stats(), print_stats).await;
    }

    let stats = service.api().get_overview_stats().await?;
    print_stats(&stats);
    Ok(())
}

async fn users(
    service: &BackendService,
    platform: Option<&str>,
    limit: Option<u32>,
    offset: Option<u32>,
    watch: bool,
) -> color_eyre::Result<()> {
    let platform = parse_platform(platform)?;
    let mut query = service.config().default_user_query().with_platform(platform);
    if let Some(limit) = limit {
        query = query.with_limit(limit);
    }
    if let Some(offset) = offset {
        query = query.with_offset(offset);
    }

    if watch {
        return watch_states(service.watch_users(query), print_users).await;
    }

    let page = service.api().get_users(&query).await?;
    print_users(&page);
    Ok(())
}

async fn messages(
    service: &BackendService,
    user: Option<&str>,
    limit: Option<u32>,
    watch: bool,
) -> color_eyre::Result<()> {
    let query = match limit {
        Some(limit) => MessageQuery::new().with_limit(limit),
        None => service.config().default_message_query(),
    };

    match user {
        Some(user) => {
            let user_id = UserId::new(user);
            if watch {
                return watch_states(
                    service.watch_user_messages(user_id, query),
                    |feed: &Vec<MessageDto>| print_messages(feed),
                )
                .await;
            }
            let feed = service.api().get_user_messages(&user_id, &query).await?;
            print_messages(&feed);
        },
        None => {
            if watch {
                return watch_states(service.watch_messages(query), |feed: &Vec<MessageDto>| {
                    print_messages(feed)
                })
                .await;
            }
            let feed = service.api().get_messages(&query).await?;
            print_messages(&feed);
        },
    }

    Ok(())
}

async fn broadcast(
    api: &BackendApi,
    text: &str,
    platform: Option<&str>,
) -> color_eyre::Result<()> {
    let platform = parse_platform(platform)?;
    let request = BroadcastRequest { text: text.into(), platform };

    let mutation = Mutation::new();
    match mutation
        .run(|req| async move { api.broadcast_message(&req).await }, request)
        .await
    {
        Some(outcome) => {
            println!("{}", outcome.message);
            Ok(())
        },
        None => Err(mutation_error(&mutation, "Broadcast failed")),
    }
}

async fn setup_webhooks(api: &BackendApi) -> color_eyre::Result<()> {
    let mutation = Mutation::new();
    match mutation.run(|()| async { api.setup_webhooks().await }, ()).await {
        Some(outcome) => {
            println!("telegram: {}", describe_webhook(&outcome.results.telegram));
            println!("viber: {}", describe_webhook(&outcome.results.viber));
            if !outcome.success {
                return Err(eyre!("Webhook setup reported failure"));
            }
            Ok(())
        },
        None => Err(mutation_error(&mutation, "Webhook setup failed")),
    }
}

/// Print each settled snapshot until Ctrl-C, then stop the watcher
async fn watch_states<T, F>(watcher: Watcher<T>, render: F) -> color_eyre::Result<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T),
{
    let mut states = watcher.subscribe();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if state.loading {
                    continue;
                }
                if let Some(error) = &state.error {
                    eprintln!("error [{}]: {}", error.kind, error.message);
                } else if let Some(data) = &state.data {
                    render(data);
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.shutdown().await;
    Ok(())
}

fn parse_platform(platform: Option<&str>) -> color_eyre::Result<Option<Platform>> {
    platform
        .map(|p| p.parse::<Platform>().map_err(|e| eyre!(e)))
        .transpose()
}

fn mutation_error(mutation: &Mutation, context: &str) -> Report {
    match mutation.state().error {
        Some(error) => eyre!("{context}: {error}"),
        None => eyre!("{context}"),
    }
}

fn print_stats(stats: &OverviewStats) {
    println!(
        "users: {} (viber {} / telegram {})",
        stats.total_users, stats.platforms.viber.users, stats.platforms.telegram.users
    );
    println!(
        "messages: {} today, {} total",
        stats.messages_today, stats.total_messages
    );
    println!("active sessions: {}", stats.active_sessions);
}

fn print_users(page: &UserPage) {
    for user in &page.users {
        println!(
            "{}  {:<8}  {}  {}",
            user.id,
            user.platform,
            user.label(),
            if user.is_active { "active" } else { "inactive" },
        );
    }
    println!(
        "{} of {} users shown, {} active",
        page.users.len(),
        page.total,
        page.active_count()
    );
}

fn print_messages(messages: &[MessageDto]) {
    for message in messages {
        let arrow = match message.direction {
            MessageDirection::In => "<-",
            MessageDirection::Out => "->",
        };
        let sender = message
            .user
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("-");
        println!(
            "{} {} {} [{}] {}",
            message.created_at.with_timezone(&Local).format("%H:%M:%S"),
            arrow,
            sender,
            message.platform,
            message.content
        );
    }

    let senders = distinct_senders(messages);
    if !senders.is_empty() {
        println!(
            "participants: {}",
            senders.iter().map(|u| u.display_name.as_str()).join(", ")
        );
    }
}

fn describe_webhook(target: &WebhookTarget) -> String {
    if target.success {
        format!("ok ({})", target.url)
    } else {
        "failed".to_string()
    }
}
