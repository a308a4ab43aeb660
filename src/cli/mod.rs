//! Command-line interface parsing and handling
//!
//! Parses arguments with clap and dispatches to the chat UI, the one-shot
//! `say` command, or the auth and config subcommands.

pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::auth::{interactive_auth, interactive_deauth, resolve_api_key};
use crate::core::app::App;
use crate::core::chat_stream::BackendProvider;
use crate::core::config::{path_display, Config, ConfigKey};
use crate::core::gemini::GeminiProvider;
use crate::core::pricing::{format_pricing_guide, SHOP_NAME};
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_tracing, TranscriptLog};

#[derive(Parser, Debug)]
#[command(name = "stitchperfect")]
#[command(version)]
#[command(about = "Chat with Anka, the StitchPerfect Boutique tailoring assistant")]
#[command(
    long_about = "A terminal chat client for StitchPerfect Boutique. Introduce yourself with \
your name and phone number, then ask Anka about stitching prices, fabrics and delivery times. \
Replies stream in from Google Gemini.\n\n\
Authentication:\n\
  Use 'stitchperfect auth' to store a Gemini API key in your system keyring.\n\n\
Environment Variables (checked before the keyring):\n\
  GEMINI_API_KEY    Your Gemini API key\n\
  API_KEY           Fallback API key variable\n\
  RUST_LOG          Filter for --debug-log output\n\n\
Controls:\n\
  Tab/Up/Down       Move between contact form fields\n\
  Enter             Start the consultation / send a message\n\
  Alt+Enter         Insert a newline\n\
  PageUp/PageDown   Scroll through the conversation\n\
  Ctrl+L            End the session\n\
  Ctrl+C/Esc        Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Gemini model to use for this run
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Append the conversation transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Only read the API key from environment variables
    #[arg(long, global = true)]
    pub env_only: bool,

    /// Write diagnostic tracing output to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one message without the TUI and print the reply
    Say {
        /// Your name
        #[arg(long)]
        name: String,
        /// Your contact number
        #[arg(long)]
        phone: String,
        /// Message to send
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    /// Print the stitching price guide
    Pricing,
    /// Store a Gemini API key in the system keyring
    Auth,
    /// Remove the stored Gemini API key
    Deauth,
    /// Set a configuration value
    Set {
        /// One of: model, base-url, request-timeout, log-file
        key: String,
        /// Value to set for the key
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if let Err(err) = init_tracing(args.debug_log.as_deref()) {
        eprintln!("⚠️  Could not enable debug logging: {err}");
    }

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(mut args: Args) -> Result<(), Box<dyn Error>> {
    match args.command.take().unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let app = build_app(&args, &config)?;
            run_chat(app).await
        }
        Commands::Say {
            name,
            phone,
            message,
        } => {
            let config = Config::load()?;
            let mut app = build_app(&args, &config)?;
            let prompt = message.join(" ");
            let mut stdout = std::io::stdout();
            if let Err(err) = say::run_say(&mut app, &name, &phone, &prompt, &mut stdout).await {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Pricing => {
            println!("{SHOP_NAME} price guide:");
            println!("{}", format_pricing_guide());
            Ok(())
        }
        Commands::Auth => {
            if let Err(err) = interactive_auth() {
                eprintln!("❌ Authentication failed: {err}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            if let Err(err) = interactive_deauth() {
                eprintln!("❌ Deauthentication failed: {err}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            let mut config = Config::load()?;
            config.set_value(key, &value.join(" "))?;
            config.save()?;
            println!("✅ Set {} to: {}", key.as_str(), config.display_value(key));
            Ok(())
        }
        Commands::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            let mut config = Config::load()?;
            config.unset_value(key);
            config.save()?;
            println!("✅ Unset {}", key.as_str());
            Ok(())
        }
    }
}

/// Transcript log path: the `--log` flag wins over the `log-file` setting.
fn transcript_log_path(args: &Args, config: &Config) -> Option<PathBuf> {
    args.log
        .clone()
        .or_else(|| config.log_file.as_ref().map(PathBuf::from))
}

fn build_app(args: &Args, config: &Config) -> Result<App, Box<dyn Error>> {
    let settings = config.gemini_settings(args.model.as_deref());
    let credential = resolve_api_key(args.env_only);
    if credential.is_none() {
        warn!("no Gemini API key found; the assistant will be unavailable");
    }
    info!(model = %settings.model, "using Gemini settings");
    let provider: Arc<dyn BackendProvider> = Arc::new(GeminiProvider::new(
        settings,
        credential.map(|credential| credential.api_key),
    ));

    let transcript_log = match transcript_log_path(args, config) {
        Some(path) => TranscriptLog::to_file(&path).map_err(|err| {
            format!("Cannot write transcript log {}: {err}", path_display(&path))
        })?,
        None => TranscriptLog::disabled(),
    };

    Ok(App::new(provider).with_transcript_log(transcript_log))
}
