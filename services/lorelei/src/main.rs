use anyhow::{Context, Result};
use clap::Parser;
use lorelei_core::dialogue::DialogueSession;
use lorelei_core::fact_store::FactStore;
use lorelei_core::generator::Generator;
use lorelei_core::intake::{run_chat_loop, run_voice_loop};
use lorelei_core::{Command, InboundEvent, conversation::Conversation};
use lorelei_service::config::{Config, GeneratorProvider, POLL_INTERVAL};
use lorelei_service::gemini_adapter::GeminiGenerator;
use lorelei_service::openai_adapter::OpenAiGenerator;
use lorelei_service::voice::VoiceSource;
use lorelei_service::{backup, prompt_loader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing_subscriber::fmt::time::ChronoLocal;
use twitch_chat::{ChatConfig, ReconnectPolicy};

#[derive(Parser)]
#[command(version, about = "Twitch chat companion bot")]
struct Cli {
    /// Directory holding the persona prompt (`system.md`)
    #[arg(long, default_value = "prompts")]
    prompts: PathBuf,

    /// Run chat-only, without reading the streamer's voice transcript
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting Lorelei...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Prompts ---
    let prompts = prompt_loader::load_prompts(&args.prompts).context("Failed to load prompts")?;
    let system_prompt = prompt_loader::system_prompt(&prompts, &config.engine.streamer)?;
    tracing::info!("Loaded {} prompts successfully.", prompts.len());

    // --- 5. Open the Fact Store ---
    match backup::backup_fact_file(&config.memory_file) {
        Ok(Some(path)) => tracing::info!("Backed up memory to {}", path.display()),
        Ok(None) => {}
        Err(e) => tracing::warn!("Memory backup failed: {:?}", e),
    }
    let facts = FactStore::open(&config.memory_file);

    // --- 6. Initialize the Generator ---
    let generator: Box<dyn Generator> = match config.provider {
        GeneratorProvider::Gemini => Box::new(GeminiGenerator::new(
            config.api_key,
            config.chat_model.clone(),
            system_prompt,
            config.generator_timeout,
        )?),
        GeneratorProvider::OpenAI => Box::new(OpenAiGenerator::new(
            config.api_key,
            config.chat_model.clone(),
            system_prompt,
            config.generator_timeout,
        )?),
    };
    tracing::info!("Using {:?} model {}", config.provider, config.chat_model);

    // --- 7. Application Setup ---
    // Create the command channel to decouple core logic from the runtime.
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let dialogue = DialogueSession::new(generator, facts, config.engine.max_history);
    let conversation = Arc::new(Mutex::new(Conversation::new(
        config.engine,
        dialogue,
        command_tx,
    )));

    let (chat, mut chat_messages) = twitch_chat::spawn(
        ChatConfig {
            url: config.twitch_url,
            nick: config.bot_nick,
            token: config.twitch_token,
            channel: config.channel,
        },
        ReconnectPolicy::fixed(config.reconnect_delay),
    );

    // --- 8. Spawn Concurrent Tasks ---
    let (event_tx, event_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let forwarder = tokio::spawn(async move {
        while let Some(message) = chat_messages.recv().await {
            tracing::debug!("[{}]: {}", message.username, message.text);
            let event = InboundEvent::Chat {
                username: message.username,
                text: message.text,
            };
            if event_tx.send(event).is_err() {
                break;
            }
        }
    });

    // The command handler owns the chat client, which keeps the connection alive.
    let command_handler = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::SendChat(text) => {
                    chat.send(&text);
                }
            }
        }
    });

    let (voice_tx, voice_rx) = mpsc::unbounded_channel::<String>();
    if args.no_voice {
        tracing::info!("Voice input disabled.");
    } else {
        VoiceSource::new(config.voice_command).start(voice_tx.clone());
    }
    let voice_loop = tokio::spawn(run_voice_loop(conversation.clone(), voice_rx));
    let chat_loop = tokio::spawn(run_chat_loop(conversation, event_rx, POLL_INTERVAL));

    tokio::select! {
        _ = chat_loop => {},
        _ = forwarder => {},
        _ = command_handler => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }
    voice_loop.abort();
    drop(voice_tx);
    tracing::info!("Shutting down...");
    Ok(())
}
