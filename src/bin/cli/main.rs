mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "parley-cli", about = "Inspect and edit Parley's encrypted store", version)]
struct Cli {
    /// Override the data directory from the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/parley/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Read and change application settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Browse and manage conversations
    #[command(subcommand)]
    Conversations(ConversationsCommand),
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the whole settings document (API keys redacted)
    Show {
        /// Print API keys in clear text
        #[arg(long)]
        reveal: bool,
    },

    /// Print one value by dot path, e.g. `openai.baseUrl`
    Get { path: String },

    /// Set one value by dot path. The value is parsed as JSON when possible,
    /// otherwise stored as a string.
    Set { path: String, value: String },
}

#[derive(Subcommand)]
enum ConversationsCommand {
    /// List conversations, newest month first
    List {
        /// Continue from the token printed by a previous page
        #[arg(long)]
        token: Option<String>,
        /// Follow tokens and print every conversation
        #[arg(long, conflicts_with = "token")]
        all: bool,
    },

    /// Show a conversation with its messages
    Show { id: Uuid },

    /// Start a new, empty conversation
    New {
        /// Title (defaults to "New conversation")
        title: Option<String>,
    },

    /// Delete a conversation
    Delete { id: Uuid },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Command::Settings(subcmd) => match subcmd {
            SettingsCommand::Show { reveal } => {
                commands::settings::run_show(&app, reveal, &cli.format, use_color)?;
            }
            SettingsCommand::Get { path } => {
                commands::settings::run_get(&app, &path, &cli.format)?;
            }
            SettingsCommand::Set { path, value } => {
                commands::settings::run_set(&app, &path, &value, &cli.format, use_color)?;
            }
        },
        Command::Conversations(subcmd) => match subcmd {
            ConversationsCommand::List { token, all } => {
                commands::conversations::run_list(
                    &app,
                    token.as_deref(),
                    all,
                    &cli.format,
                    use_color,
                )?;
            }
            ConversationsCommand::Show { id } => {
                commands::conversations::run_show(&app, id, &cli.format, use_color)?;
            }
            ConversationsCommand::New { title } => {
                commands::conversations::run_new(&app, title.as_deref(), &cli.format, use_color)?;
            }
            ConversationsCommand::Delete { id } => {
                commands::conversations::run_delete(&app, id, &cli.format, use_color)?;
            }
        },
    }

    Ok(())
}
