//! Clap adapter for the file-management tasks.
//!
//! This module is the optional integration layer between the
//! framework-agnostic task layer and the [clap](https://docs.rs/clap)
//! parser. It is compiled only when the `clap` Cargo feature is enabled
//! (on by default).
//!
//! The only bridge to the core is [`TaskCommand::into_action()`]; all
//! logic flows through the clap-free [`tasks`](crate::tasks) module. Apps
//! with their own argument parser can skip this module and construct
//! [`TaskAction`](crate::tasks::TaskAction) values directly.

use std::collections::BTreeMap;

use clap::{Parser, Subcommand};

use crate::keys::TerminalPrompt;
use crate::tasks::{self, TaskAction};

/// Command-line surface for managing a namespace's config and secrets files.
#[derive(Debug, Parser)]
#[command(name = "confidant")]
pub struct TaskCli {
    /// Namespace whose files to manage.
    #[arg(long)]
    pub namespace: String,

    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum TaskCommand {
    /// Create a plaintext config.yml at the primary search location.
    CreateConfig,
    /// Create an encrypted secrets.yml; the generated key prints to stdout.
    CreateSecrets,
    /// Open config.yml in $VISUAL/$EDITOR.
    EditConfig,
    /// Decrypt secrets.yml into a scratch file, edit, and re-encrypt.
    EditSecrets,
    /// Re-encrypt secrets.yml under a fresh key; the new key prints to stdout.
    RotateSecrets,
}

impl TaskCommand {
    /// Convert clap-parsed args into a framework-agnostic `TaskAction`.
    pub fn into_action(self) -> TaskAction {
        match self {
            TaskCommand::CreateConfig => TaskAction::CreateConfig,
            TaskCommand::CreateSecrets => TaskAction::CreateSecrets,
            TaskCommand::EditConfig => TaskAction::EditConfig,
            TaskCommand::EditSecrets => TaskAction::EditSecrets,
            TaskCommand::RotateSecrets => TaskAction::RotateSecrets,
        }
    }
}

/// Execute a parsed command against the process environment and return the
/// exit code for the caller to use. Key material goes to stdout so it can
/// be piped; notes and errors go to stderr.
///
/// The library itself never calls `process::exit`.
pub fn run(cli: TaskCli) -> i32 {
    let env: BTreeMap<String, String> = std::env::vars().collect();
    let mut prompt = TerminalPrompt;
    match tasks::execute(&cli.namespace, &cli.command.into_action(), &env, &mut prompt) {
        Ok(outcome) => {
            if let Some(key) = outcome.key_material {
                println!("{key}");
            }
            for note in outcome.notes {
                eprintln!("{note}");
            }
            0
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
