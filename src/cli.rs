//! Command-line interface definition for ctutor
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat command and session inspection.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ctutor - C programming tutor chat
///
/// Chat with an AI tutor for the C language. Conversations are kept as
/// separate sessions and restored on the next start.
#[derive(Parser, Debug, Clone)]
#[command(name = "ctutor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the session store location
    #[arg(long, env = "CTUTOR_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ctutor
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive tutoring chat
    Chat {
        /// Override the provider from config (gemini, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// Resume a stored session by id
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Inspect stored chat sessions
    Sessions {
        /// Session subcommand
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

/// Session inspection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List stored sessions, most recent first
    List,

    /// Print a stored session's transcript
    Show {
        /// Session id
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            store_path: None,
            command: Commands::Chat {
                provider: None,
                resume: None,
            },
        }
    }
}
