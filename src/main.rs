//! fiction-pilot - let LLM agents play an interactive fiction game
//!
//! Starts the interpreter on a pseudoterminal, echoes the game on stdout,
//! and writes session logs under the configured log directory.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

use fiction_pilot::agents::{AgentContext, GeminiClient, LlmAgents};
use fiction_pilot::config::Config;
use fiction_pilot::console::StdoutConsole;
use fiction_pilot::history::{InteractionLog, SessionLogs};
use fiction_pilot::orchestrator::{LoopSettings, TurnOrchestrator};
use fiction_pilot::pty::{PtySession, SpawnConfig};
use fiction_pilot::speech::{CommandSpeech, SpeechSink};
use fiction_pilot::{terminal, ConfigLoader};

/// Drive an interactive fiction interpreter with LLM agents
#[derive(Parser, Debug)]
#[command(name = "fiction-pilot", version, about)]
struct Cli {
    /// Story file to play (defaults to the configured game file)
    game_file: Option<PathBuf>,

    /// Interpreter program to run the story with
    #[arg(long)]
    interpreter: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for session logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(game_file) = &self.game_file {
            config.game.game_file = game_file.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.game.interpreter = interpreter.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.logging.log_dir = log_dir.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("💥 {:#}", e);
        eprintln!("fiction-pilot: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new().with_explicit_path(cli.config.clone());
    let mut config = loader.load().context("loading configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("validating configuration")?;

    fiction_pilot::init_logging(&config.logging.log_dir, cli.debug)
        .context("initializing logging")?;

    let session_id = Uuid::new_v4();
    info!(
        "🚀 Starting {} v{} (session {})",
        fiction_pilot::NAME,
        fiction_pilot::VERSION,
        session_id
    );
    match loader.current_path() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => debug!("Using built-in configuration"),
    }

    let client = GeminiClient::from_config(&config.agents).context("configuring the agent backend")?;
    info!("Agents use model {}", client.model());

    let interactions = Arc::new(InteractionLog::new(&config.logging.log_dir));
    let agents = Arc::new(LlmAgents::new(client).with_interaction_log(interactions));
    let speech: Option<Arc<dyn SpeechSink>> = config
        .interaction
        .use_tts
        .then(|| Arc::new(CommandSpeech::from_config(&config.speech)) as Arc<dyn SpeechSink>);
    let context = AgentContext::from_agents(
        agents,
        config.call_timeout(),
        &config.agents.default_command,
    )
    .with_speech(speech);

    let game_file = config.game.game_file.clone();
    let logs = SessionLogs::create(&config.logging.log_dir, &game_file)
        .context("creating session logs")?;

    let spawn_config = SpawnConfig {
        rows: config.pty.rows,
        cols: config.pty.cols,
        read_chunk_size: config.pty.read_chunk_size,
        ..SpawnConfig::for_game(&config.game.interpreter, &config.game.extra_args, &game_file)
    };
    let session = PtySession::start(&game_file, &spawn_config)
        .with_context(|| format!("starting {}", config.game.interpreter))?;
    info!("🎮 Playing {}", session.process());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut orchestrator = TurnOrchestrator::new(
        session,
        terminal::boundary::from_config(&config.pty),
        context,
        logs,
        Box::new(StdoutConsole::new(config.interaction.wait_for_key)),
        LoopSettings::from_config(&config),
    );
    let summary = orchestrator.run(shutdown_rx).await?;

    println!();
    println!(
        "Session ended: {} turns, {} narrations, {} fallbacks ({:?})",
        summary.turns, summary.narrations, summary.fallbacks, summary.exit_reason
    );
    println!("Logs: {}", orchestrator.logs().paths().text_log.display());
    info!("Session {} finished", session_id);
    Ok(())
}
