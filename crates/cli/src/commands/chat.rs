//! `marquee chat` — Interactive or single-message chat mode.

use marquee_agent::Orchestrator;
use marquee_config::AppConfig;
use marquee_dispatch::Dispatcher;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY   (OpenAI direct)");
        eprintln!("    MARQUEE_API_KEY  (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Movie data needs TMDB_API_ACCESS_TOKEN and SERP_API_KEY too.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = Arc::new(
        marquee_providers::build_from_config(&config)
            .map_err(|e| format!("Provider setup failed: {e}"))?,
    );

    let registry = Arc::new(marquee_functions::default_registry(&config));

    let dispatcher = Dispatcher::new(provider.clone(), registry, &config.openai.model)
        .with_temperature(config.openai.temperature)
        .with_max_tokens(config.openai.max_tokens)
        .with_max_callback_depth(config.dispatch.max_callback_depth);

    // Stream answer tokens straight to the terminal
    let (tx, mut rx) = mpsc::channel::<String>(64);
    tokio::spawn(async move {
        while let Some(token) = rx.recv().await {
            print!("{token}");
            let _ = std::io::stdout().flush();
        }
    });

    let mut orchestrator = Orchestrator::new(provider, dispatcher, &config.openai.model)
        .with_temperature(config.openai.temperature)
        .with_max_tokens(config.openai.max_tokens)
        .with_token_sink(tx);

    if let Some(prompt) = &config.persona.system_prompt_override {
        orchestrator = orchestrator.with_system_prompt(prompt);
    }

    if let Some(msg) = message {
        // Single message mode
        orchestrator.respond(&msg).await?;
        println!();
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Marquee — movie chat");
    println!();
    println!("  Model: {}", config.openai.model);
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        println!();
        print!("  Marquee > ");
        std::io::stdout().flush()?;

        match orchestrator.respond(line).await {
            Ok(_) => {
                println!();
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    Ok(())
}
