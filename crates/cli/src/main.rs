use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sage_agents::TutorAgent;
use sage_calc::{evaluate, format_number};
use sage_constants::{format_constant, ConstantsTable};
use sage_core::ChatInput;
use sage_llm::Generator;
use sage_observability::{init_tracing, AppMetrics};
use sage_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "sage")]
#[command(about = "Sage Tutor CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive tutoring session.
    Chat,
    /// Ask a single question and print the routed reply.
    Ask { question: String },
    /// Evaluate an arithmetic expression deterministically.
    Eval { expression: String },
    /// Look up physical constants by name, or list them all.
    Constants {
        name: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show what the tutor can do.
    Capabilities,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("sage_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Chat => {
            let agent = build_agent().await?;
            run_chat(agent).await?;
        }
        Command::Ask { question } => {
            let agent = build_agent().await?;
            let reply = agent.route(&question).await;
            println!("{}", reply.reply_text);
        }
        Command::Eval { expression } => {
            let value = evaluate(&expression)
                .with_context(|| format!("cannot evaluate {expression}"))?;
            println!("{} = {}", expression, format_number(value));
        }
        Command::Constants { name, search } => {
            let constants = load_constants()?;
            match (name, search) {
                (Some(name), _) => match constants.get(&name) {
                    Some(record) => {
                        let canonical = name.trim().to_lowercase().replace(' ', "_");
                        println!("{}", format_constant(&canonical, record));
                    }
                    None => anyhow::bail!("no constant named {name}"),
                },
                (None, Some(keyword)) => {
                    for (name, record) in constants.search(&keyword) {
                        println!("{}", format_constant(&name, &record));
                    }
                }
                (None, None) => {
                    for name in constants.names() {
                        if let Some(record) = constants.get(&name) {
                            println!("{}", format_constant(&name, record));
                        }
                    }
                }
            }
        }
        Command::Capabilities => {
            let agent = build_agent().await?;
            println!("{}", agent.capabilities());
        }
    }

    Ok(())
}

async fn run_chat(agent: TutorAgent<Generator, Store>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Sage Tutor chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent
            .handle_chat(ChatInput {
                session_id: session_id.clone(),
                text: message.to_string(),
                user_id: None,
            })
            .await;

        if let Some(id) = reply
            .json_payload
            .get("session_id")
            .and_then(|value| value.as_str())
            .map(ToString::to_string)
        {
            session_id = Some(id);
        }

        println!("\n{}\n", reply.reply_text);
    }

    Ok(())
}

async fn build_agent() -> Result<TutorAgent<Generator, Store>> {
    let metrics = AppMetrics::shared();
    let generator = Generator::from_env()?;
    let constants = load_constants()?;

    let store = if let Ok(database_url) = env::var("SAGE_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    Ok(TutorAgent::new(
        Arc::new(generator),
        constants,
        Arc::new(store),
        metrics,
    ))
}

fn load_constants() -> Result<ConstantsTable> {
    match env::var("SAGE_CONSTANTS_PATH") {
        Ok(path) => ConstantsTable::from_json_file(&path)
            .with_context(|| format!("failed loading constants from {path}")),
        Err(_) => Ok(ConstantsTable::builtin()),
    }
}
