//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use blogspace_core::models::ProfileUpdate;
use blogspace_core::{ApiGateway, SessionManager, SessionStore, config, logging};
use clap::Parser;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "blogspace")]
#[command(version)]
#[command(about = "Terminal client for the BlogSpace blogging platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the API base URL from config
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with username and password (password is read from stdin)
    Login {
        /// Account username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Create an account and log in (password is read from stdin)
    Register(commands::auth::RegisterArgs),

    /// Log out and remove the stored session
    Logout,

    /// Show the signed-in user from the stored session
    Whoami,

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Browse and manage blog posts
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Fetch and show your profile
    Show,
    /// Update profile fields
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// List posts, newest first
    List {
        /// Only posts you wrote
        #[arg(long)]
        mine: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a single post
    Show {
        #[arg(value_name = "POST_ID")]
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Publish a new post
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
    },
    /// Change the title and/or content of a post
    Edit {
        #[arg(value_name = "POST_ID")]
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a post
    Delete {
        #[arg(value_name = "POST_ID")]
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Store the API base URL in the config file
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::Config::load().context("load config")?;
    if let Some(url) = cli.api_url.as_deref() {
        config.override_api_base_url(url);
    }

    let _log_guard = logging::init(&config).context("init logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli.command, &config).await })
}

fn session_manager(config: &config::Config) -> Result<SessionManager> {
    let store = Arc::new(SessionStore::open_default());
    let gateway = ApiGateway::new(config, store).context("create API client")?;
    debug!(base_url = %gateway.base_url(), "api client ready");
    Ok(SessionManager::new(Arc::new(gateway)))
}

async fn dispatch(command: Commands, config: &config::Config) -> Result<()> {
    let manager = || session_manager(config);

    match command {
        Commands::Login { username } => commands::auth::login(&mut manager()?, username).await,
        Commands::Register(args) => commands::auth::register(&mut manager()?, args).await,
        Commands::Logout => commands::auth::logout(&mut manager()?).await,
        Commands::Whoami => commands::auth::whoami(&mut manager()?),

        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&mut manager()?).await,
            ProfileCommands::Update {
                first_name,
                last_name,
                bio,
            } => {
                let update = ProfileUpdate {
                    first_name,
                    last_name,
                    bio,
                };
                commands::profile::update(&mut manager()?, &update).await
            }
        },

        Commands::Posts { command } => match command {
            PostCommands::List { mine, json } => {
                commands::posts::list(&mut manager()?, mine, json).await
            }
            PostCommands::Show { id, json } => {
                commands::posts::show(&mut manager()?, id, json).await
            }
            PostCommands::Create { title, content } => {
                commands::posts::create(&mut manager()?, title, content).await
            }
            PostCommands::Edit { id, title, content } => {
                commands::posts::edit(&mut manager()?, id, title, content).await
            }
            PostCommands::Delete { id, yes } => {
                commands::posts::delete(&mut manager()?, id, yes).await
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
    }
}
