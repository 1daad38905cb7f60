pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

pub const DEFAULT_URL: &str = "http://localhost:7233";

#[derive(Parser)]
#[command(name = "imctl")]
#[command(about = "Instance Manager CLI - send named requests and move translation files")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "INSTANCE_MANAGER_URL", default_value = DEFAULT_URL, help = "Server base URL")]
    pub url: String,

    #[arg(long, global = true, env = "INSTANCE_MANAGER_TOKEN", help = "Bearer token")]
    pub token: Option<String>,

    #[arg(long, global = true, env = "INSTANCE_MANAGER_API_KEY", help = "API key sent as X-API-Key")]
    pub api_key: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Send a named request with an optional JSON body")]
    Send {
        #[arg(help = "Request name, e.g. GetProjectInstancesQuery")]
        name: String,
        #[arg(help = "JSON body (defaults to {})")]
        body: Option<String>,
    },

    #[command(about = "List the request names the server accepts")]
    Requests,

    #[command(about = "Check server health status from the /health endpoint")]
    Health,

    #[command(about = "Export translations to a file or stdout")]
    Export {
        #[arg(long, default_value = "csv", help = "Export format")]
        format: String,
        #[arg(long, help = "Column to order by, e.g. TranslationName")]
        order_by: Option<String>,
        #[arg(long, help = "asc or desc")]
        direction: Option<String>,
        #[arg(long, help = "Free-text search term")]
        search: Option<String>,
        #[arg(long, short, help = "Write to this path instead of stdout")]
        output: Option<String>,
    },

    #[command(about = "Import a CSV file of translations into a data set")]
    Import {
        #[arg(help = "Target data set id")]
        data_set_id: String,
        #[arg(help = "CSV file path")]
        file: String,
    },

    #[command(about = "Mint a development token signed with JWT_SECRET")]
    Token {
        #[arg(help = "User id placed in the sub claim")]
        user_id: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Email address")]
        email: Option<String>,
        #[arg(long, help = "Hours until expiry (defaults to the configured expiry)")]
        hours: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = || ApiClient::new(&cli.url, cli.token.clone(), cli.api_key.clone());

    match cli.command {
        Commands::Send { ref name, ref body } => {
            commands::query::send(&client()?, name, body.as_deref(), output_format).await
        }
        Commands::Requests => commands::query::requests(&client()?, output_format).await,
        Commands::Health => commands::query::health(&client()?, output_format).await,
        Commands::Export { ref format, ref order_by, ref direction, ref search, ref output } => {
            let options = commands::translations::ExportOptions {
                format: format.clone(),
                order_by: order_by.clone(),
                direction: direction.clone(),
                search: search.clone(),
            };
            commands::translations::export(&client()?, &options, output.as_deref(), output_format).await
        }
        Commands::Import { ref data_set_id, ref file } => {
            commands::translations::import(&client()?, data_set_id, file, output_format).await
        }
        Commands::Token { ref user_id, ref name, ref email, hours } => {
            commands::token::mint(user_id, name.clone(), email.clone(), hours, output_format)
        }
    }
}
