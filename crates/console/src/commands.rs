//! In-session command language.
//!
//! Input starting with `%` is a console command; so is a bare `help`.
//! Anything else goes to the controller untouched.

use crate::errors::CommandError;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

pub const COMMAND_SIGIL: char = '%';

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "run",
        usage: "%run [-c|--continue-on-error] <file>...",
        summary: "Send each line of the files, waiting for its ok/error. Stops at the first error unless -c is given.",
    },
    CommandSpec {
        name: "check",
        usage: "%check [-c|--continue-on-error] <file>...",
        summary: "Like %run, but in check mode: the controller parses the files without moving. The previous mode is restored afterwards.",
    },
    CommandSpec {
        name: "status",
        usage: "%status",
        summary: "Query and print the controller status.",
    },
    CommandSpec {
        name: "reset",
        usage: "%reset",
        summary: "Soft-reset the controller (ctrl-x).",
    },
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "Show this help.",
    },
];

/// Arguments shared by `%run` and `%check`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct PlaybackArgs {
    /// Keep going after a line is rejected
    #[arg(short = 'c', long)]
    pub continue_on_error: bool,

    /// G-code files, played in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(PlaybackArgs),
    Check(PlaybackArgs),
    Status,
    Reset,
    Help,
}

/// What one line of operator input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line, nothing to do.
    Empty,
    Command(Command),
    /// Forward to the controller as-is.
    Raw(String),
}

pub fn parse_input(line: &str) -> Result<Input, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Empty);
    }
    if trimmed == "help" {
        return Ok(Input::Command(Command::Help));
    }
    let Some(body) = trimmed.strip_prefix(COMMAND_SIGIL) else {
        return Ok(Input::Raw(line.trim_end().to_string()));
    };

    // Shell-style words, so quoted file names may contain spaces.
    let words = shlex::split(body)
        .ok_or_else(|| CommandError::Usage(format!("Unbalanced quotes in: {}", trimmed)))?;
    let (name, args) = match words.split_first() {
        Some((name, args)) => (name.as_str(), args),
        None => ("", &[][..]),
    };

    let command = match name {
        "run" => Command::Run(parse_playback("%run", args)?),
        "check" => Command::Check(parse_playback("%check", args)?),
        "status" => no_args(name, args, Command::Status)?,
        "reset" => no_args(name, args, Command::Reset)?,
        "help" => Command::Help,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Input::Command(command))
}

fn parse_playback(name: &'static str, args: &[String]) -> Result<PlaybackArgs, CommandError> {
    let matches = PlaybackArgs::command()
        .name(name)
        .bin_name(name)
        .try_get_matches_from(args)
        .map_err(|e| CommandError::Usage(e.render().to_string().trim_end().to_string()))?;
    PlaybackArgs::from_arg_matches(&matches)
        .map_err(|e| CommandError::Usage(e.to_string().trim_end().to_string()))
}

fn no_args(name: &str, args: &[String], command: Command) -> Result<Command, CommandError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::Usage(format!(
            "%{} takes no arguments (got: {})",
            name,
            args.join(" ")
        )))
    }
}

pub fn help_text() -> String {
    let mut text = String::from("Console commands:\n");
    for spec in COMMANDS {
        text.push_str(&format!("\n  {}\n      {}\n", spec.usage, spec.summary));
    }
    text.push_str("\nAny other input is sent to the controller as a command line.\n");
    text
}
