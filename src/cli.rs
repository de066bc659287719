//! Concierge CLI - local inspection tool for the assistant graph
//!
//! Usage:
//!   concierge store <user> "content"         Store a memory
//!   concierge recall <user>                  Recall recent memories
//!   concierge delete <memory-id>             Delete a memory
//!   concierge record <user> <action> <ctx>   Record an action occurrence
//!   concierge habits <user>                  List detected habits
//!   concierge context <user>                 Show the assembled context

use clap::{Parser, Subcommand};
use colored::*;
use concierge::Assistant;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Concierge - graph-backed memory and habits for personal assistants")]
#[command(version)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, default_value = "./concierge_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new memory for a user
    Store {
        /// User id
        user_id: String,

        /// Memory content
        content: String,

        /// Context type
        #[arg(short, long, default_value = "note")]
        context_type: String,

        /// Entities referenced by this memory (repeatable)
        #[arg(short, long)]
        entity: Vec<String>,
    },

    /// Recall a user's memories, newest first
    Recall {
        /// User id
        user_id: String,

        /// Filter by context type
        #[arg(short, long)]
        context_type: Option<String>,

        /// Filter by referenced entity (takes precedence)
        #[arg(short, long)]
        entity: Option<String>,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Delete a memory
    Delete {
        /// Memory ID
        memory_id: String,
    },

    /// Record one occurrence of an action in a context
    Record {
        /// User id
        user_id: String,

        /// Action type, e.g. snooze_alarm
        action_type: String,

        /// Context, e.g. morning
        context: String,
    },

    /// List a user's detected habits
    Habits {
        /// User id
        user_id: String,

        /// Minimum confidence
        #[arg(short, long, default_value = "0.6")]
        min_confidence: f64,
    },

    /// Show the full assembled context for a user
    Context {
        /// User id
        user_id: String,

        /// Print the rendered system prompt instead of JSON
        #[arg(long)]
        prompt: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let assistant = Assistant::new(&cli.data_dir).await?;

    match cli.command {
        Commands::Store {
            user_id,
            content,
            context_type,
            entity,
        } => {
            let memory_id = assistant
                .store_memory(&user_id, &content, &context_type, &entity, &[])
                .await?;
            println!("{}", "Memory stored".green().bold());
            println!("  ID: {}", memory_id.cyan());
        }
        Commands::Recall {
            user_id,
            context_type,
            entity,
            limit,
        } => {
            let memories = assistant
                .recall_memories(&user_id, context_type.as_deref(), entity.as_deref(), limit)
                .await?;
            if memories.is_empty() {
                println!("{}", "No memories found".yellow());
            }
            for memory in memories {
                println!(
                    "{} {} {}",
                    memory.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    format!("[{}]", memory.context_type).cyan(),
                    memory.content
                );
                println!("  {}", memory.memory_id.dimmed());
            }
        }
        Commands::Delete { memory_id } => {
            assistant.delete_memory(&memory_id).await?;
            println!("{}", "Memory deleted".green());
        }
        Commands::Record {
            user_id,
            action_type,
            context,
        } => {
            assistant.record_action(&user_id, &action_type, &context).await?;
            println!("{}", "Action recorded".green());
        }
        Commands::Habits {
            user_id,
            min_confidence,
        } => {
            let habits = assistant.get_habits(&user_id, min_confidence).await?;
            if habits.is_empty() {
                println!("{}", "No habits detected yet".yellow());
            }
            for habit in habits {
                println!(
                    "{} {} (seen {}x, confidence {:.2})",
                    habit.action_type.bold(),
                    format!("in {}", habit.context).cyan(),
                    habit.frequency,
                    habit.confidence
                );
            }
        }
        Commands::Context { user_id, prompt } => {
            let context = assistant.get_full_context(&user_id).await?;
            if prompt {
                println!("{}", context.render_prompt());
            } else {
                println!("{}", serde_json::to_string_pretty(&context)?);
            }
        }
    }

    assistant.close().await;
    Ok(())
}
