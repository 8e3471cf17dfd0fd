use clap::{Parser, Subcommand};
use colored::*;
use anyhow::{Result, anyhow};
use std::io::Write;
use std::path::PathBuf;

use issam::app::App;
use issam::config::{self, Config};
use issam::gemini::{AiGateway, GeminiGateway};
use issam::photo::{self, EditRequest};
use issam::{handler, logging, strings, tui, ui};

#[derive(Parser)]
#[command(name = "issam")]
#[command(about = "Chat with Gemini and edit photos from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the terminal UI (default)
    Tui,
    /// Ask one question and stream the answer
    Ask {
        /// Your message
        message: String,
    },
    /// Edit an image following a text instruction
    Edit {
        /// Image file (png, jpg, webp, gif)
        image: PathBuf,
        /// What to change
        #[arg(short, long)]
        prompt: String,
        /// Directory for the edited image
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Show the resolved configuration, or save new preferences
    Config {
        /// Model used for chat
        #[arg(long)]
        chat_model: Option<String>,
        /// Model used for image edits
        #[arg(long)]
        image_model: Option<String>,
        /// Directory for edited images
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}: {}", "Ignoring unreadable config".yellow(), e);
        Config::new()
    });

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(config).await,
        Commands::Ask { message } => {
            logging::init_stderr();
            ask(&config, &message).await
        }
        Commands::Edit { image, prompt, out_dir } => {
            logging::init_stderr();
            edit(&config, image, prompt, out_dir).await
        }
        Commands::Config { chat_model, image_model, output_dir } => {
            let mut stored = Config::load_file()?;
            if stored.set_preferences(chat_model, image_model, output_dir) {
                stored.save()?;
                println!("{} {}", "✅ Saved to".green(), Config::path()?.display());
                // Environment overrides still apply on top of the file
                let mut config = stored;
                config.apply_env(|name| std::env::var(name).ok());
                show_config(&config);
            } else {
                show_config(&config);
            }
            Ok(())
        }
    }
}

async fn run_tui(config: Config) -> Result<()> {
    let log_dir = config::data_dir()?.join("logs");
    let _guard = logging::init_file(&log_dir)?;
    tracing::info!(api_key_set = config.is_api_key_set(), "starting terminal UI");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(&config, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("terminal UI closed");
    result
}

fn gateway(config: &Config) -> Result<GeminiGateway> {
    GeminiGateway::new(config)
        .map_err(|_| anyhow!("{}. {}", strings::MISSING_KEY_TITLE, strings::MISSING_KEY_BODY))
}

async fn ask(config: &Config, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(anyhow!("Message is empty"));
    }
    let gateway = gateway(config)?;

    println!("{} {}\n", "Vous:".bold().cyan(), message);
    println!("{}", "Issam:".bold().yellow());

    let mut chunks = match gateway.send_message_stream(message).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::error!(error = %e, "chat request failed");
            println!("{}", strings::STREAM_FAILURE.red());
            return Ok(());
        }
    };

    let mut stdout = std::io::stdout();
    while let Some(item) = chunks.recv().await {
        match item {
            Ok(chunk) => {
                print!("{}", chunk.text);
                stdout.flush()?;
            }
            Err(e) => {
                tracing::error!(error = %e, "chat stream failed");
                println!("\n{}", strings::STREAM_FAILURE.red());
                return Ok(());
            }
        }
    }
    println!();

    Ok(())
}

async fn edit(config: &Config, image: PathBuf, prompt: String, out_dir: Option<PathBuf>) -> Result<()> {
    let gateway = gateway(config)?;
    let request = EditRequest { path: image, prompt };
    let out_dir = out_dir.unwrap_or_else(|| config.output_dir());

    println!("🖼  {} {}", "Editing".bold(), request.path.display().to_string().cyan());

    match photo::run_edit(&gateway, &request, &out_dir).await {
        Ok(result) => {
            match &result.saved_to {
                Some(path) => println!("{} {}", strings::PHOTO_SAVED_TO.green(), path.display().to_string().bold()),
                None => println!("{}", "Edited image could not be saved".yellow()),
            }
            if let Some(text) = result.text {
                println!("\n{}", text);
            }
            Ok(())
        }
        Err(message) => Err(anyhow!(message)),
    }
}

fn show_config(config: &Config) {
    let key = match config.api_key() {
        Some(key) if key.chars().count() > 4 => {
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            format!("…{}", tail)
        }
        Some(_) => "set".to_string(),
        None => "not set".red().to_string(),
    };
    let output_dir = config.output_dir();

    println!("\n{}", "⚙️  Configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  api key      {}", key);
    println!("  api base     {}", config.api_base());
    println!("  chat model   {}", config.chat_model().green());
    println!("  image model  {}", config.image_model().green());
    println!("  output dir   {}", output_dir.display());
}
