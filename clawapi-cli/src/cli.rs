use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clawapi")]
#[command(about = "Manage ClawAPI provider sessions and talk to the local gateway")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every provider in the registry
    Available,

    /// Show installed providers and whether their sessions are usable
    List,

    /// Mark a provider as installed
    Add { provider: String },

    /// Uninstall a provider
    Rm {
        provider: String,
        /// Also delete the saved session
        #[arg(long)]
        purge: bool,
    },

    /// Ask the running gateway which providers are active
    Status,

    /// Delete a provider's saved session
    Reset { provider: String },

    /// Package a provider's session into a zip archive
    Export {
        provider: String,
        /// Output file (default: <provider>_session.zip)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace a provider's session with one from a zip archive
    Import {
        provider: String,
        #[arg(value_name = "FILE")]
        archive: PathBuf,
    },

    /// Send a one-off chat completion through the running gateway
    Test {
        /// Model (provider name, optionally prefixed)
        #[arg(short, long, default_value = "claude")]
        model: String,
        /// Prompt to send
        #[arg(short, long, default_value = "Say hello in one short sentence.")]
        prompt: String,
    },
}
