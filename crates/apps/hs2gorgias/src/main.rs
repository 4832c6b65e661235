//! hs2gorgias - HelpScout to Gorgias conversation migration CLI
//!
//! Two subcommands mirror the two pipeline directions: `export` pulls
//! conversations out of HelpScout into the local document store,
//! `import` submits the stored conversations to Gorgias as tickets.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use migrate::api::{ApiAuth, ApiClient};
use migrate::config::split_list;
use migrate::storage::{ConversationStore, SqliteConversationStore};
use migrate::{ExtractOptions, MigrationConfig, extract_conversations, submit_conversations};
use url::Url;

#[derive(Parser)]
#[command(
    name = "hs2gorgias",
    about = "Migrate support conversations from HelpScout to Gorgias"
)]
struct Cli {
    /// Path of the JSON config file
    #[arg(long, global = true, default_value = "migration.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export conversations from HelpScout into the document store
    Export {
        /// Conversation status filter
        #[arg(long, env = "HELPSCOUT_STATUS", default_value = "all")]
        status: String,
        /// First conversation page to fetch
        #[arg(long, env = "HELPSCOUT_CONVERSATION_PAGE")]
        start_page: Option<u32>,
        /// Cap on conversation pages per mailbox; 0 means uncapped
        #[arg(long, env = "HELPSCOUT_CONVERSATION_PAGES", default_value_t = 0)]
        max_pages: u32,
        /// Comma-separated mailbox ids or slugs, overriding the config
        #[arg(long)]
        mailboxes: Option<String>,
    },
    /// Import stored conversations into Gorgias as tickets
    Import,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = MigrationConfig::load(&cli.config)?;

    match cli.command {
        Command::Export {
            status,
            start_page,
            max_pages,
            mailboxes,
        } => {
            if report_missing(&config.missing_for_extract()) {
                return Ok(ExitCode::FAILURE);
            }
            export(&config, status, start_page, max_pages, mailboxes)?;
        }
        Command::Import => {
            if report_missing(&config.missing_for_submit()) {
                return Ok(ExitCode::FAILURE);
            }
            import(&config)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print every missing config path; true when any were missing
fn report_missing(missing: &[String]) -> bool {
    for path in missing {
        eprintln!("Missing or empty configuration for: {}", path);
    }
    !missing.is_empty()
}

fn export(
    config: &MigrationConfig,
    status: String,
    start_page: Option<u32>,
    max_pages: u32,
    mailboxes: Option<String>,
) -> Result<()> {
    let store = open_store(config)?;
    if store.count_conversations()? > 0 {
        warn!("Store already holds documents; exporting appends rather than dedupes");
    }

    let client = ApiClient::new(
        parse_url(config.helpscout_api.url.as_deref().unwrap_or_default())?,
        ApiAuth::Bearer(config.helpscout_api.api_token.clone().unwrap_or_default()),
        config.limiter(),
        config.retry_limit(),
    );
    let options = ExtractOptions {
        mailboxes: match mailboxes {
            Some(list) => split_list(&list),
            None => config.mailbox_allow_list(),
        },
        status,
        start_page,
        max_pages,
    };

    let stats = extract_conversations(&client, &store, &options)?;
    info!(
        "Export finished: {} mailboxes, {} pages, {} conversations stored, {} threads merged, {} errors in {}ms",
        stats.mailboxes_matched,
        stats.pages_fetched,
        stats.conversations_stored,
        stats.threads_merged,
        stats.errors,
        stats.duration_ms
    );
    Ok(())
}

fn import(config: &MigrationConfig) -> Result<()> {
    let store = open_store(config)?;
    let client = ApiClient::new(
        parse_url(config.gorgias_api.url.as_deref().unwrap_or_default())?,
        ApiAuth::Basic {
            username: config.gorgias_api.username.clone().unwrap_or_default(),
            api_key: config.gorgias_api.api_key.clone().unwrap_or_default(),
        },
        config.limiter(),
        config.retry_limit(),
    );

    let stats = submit_conversations(&client, &store, &config.sender_policy())?;
    info!(
        "Import finished: {} candidates, {} submitted, {} ineligible, {} skipped in {}ms",
        stats.candidates, stats.submitted, stats.ineligible, stats.skipped, stats.duration_ms
    );
    Ok(())
}

fn open_store(config: &MigrationConfig) -> Result<SqliteConversationStore> {
    SqliteConversationStore::new(config.database.path.as_deref().unwrap_or_default())
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid API base URL: {}", raw))
}
