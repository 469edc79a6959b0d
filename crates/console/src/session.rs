use crate::commands::{help_text, parse_input, Command, Input, PlaybackArgs};
use crate::errors::Result;
use crate::output::Output;
use crate::playback::{load_programs, play};
use bridge::{Bridge, ModeChange, StatusReport, Transport};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How [`Session::handle_input_until`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    /// The cancel future won. A control transaction in progress was dropped
    /// and the default queue is active again.
    Cancelled,
}

/// Dispatches operator input: console commands are executed here, anything
/// else is written to the controller. Controller replies to raw input show up
/// on the default queue, which the caller displays.
pub struct Session<T: Transport, O: Output> {
    bridge: Arc<Bridge<T>>,
    out: O,
}

impl<T: Transport, O: Output> Session<T, O> {
    pub fn new(bridge: Arc<Bridge<T>>, out: O) -> Self {
        Self { bridge, out }
    }

    pub fn bridge(&self) -> &Arc<Bridge<T>> {
        &self.bridge
    }

    /// Handle one line of input.
    ///
    /// Recoverable problems (bad arguments, unreadable files, rejected
    /// transitions) are printed and swallowed. Only errors that end the
    /// session are returned.
    pub async fn handle_input(&mut self, line: &str) -> Result<()> {
        match self.execute(line).await {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "command failed");
                self.out.line(&format!("error: {}", e));
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// [`handle_input`](Self::handle_input), abandoned as soon as `cancel`
    /// completes (ctrl-c, a deadline). Replies that arrive after the
    /// cancellation go to the default queue.
    pub async fn handle_input_until<F: Future>(
        &mut self,
        line: &str,
        cancel: F,
    ) -> Result<Completion> {
        let completion = tokio::select! {
            result = self.handle_input(line) => {
                result?;
                Completion::Finished
            }
            _ = cancel => Completion::Cancelled,
        };
        if completion == Completion::Cancelled {
            info!(input = line, "command cancelled");
            self.out.line("cancelled");
        }
        Ok(completion)
    }

    async fn execute(&mut self, line: &str) -> Result<()> {
        match parse_input(line)? {
            Input::Empty => Ok(()),
            Input::Raw(raw) => Ok(self.bridge.send(&raw).await?),
            Input::Command(command) => {
                debug!(?command, "console command");
                self.run_command(command).await
            }
        }
    }

    async fn run_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Run(args) => self.run_files(args, false).await,
            Command::Check(args) => self.run_files(args, true).await,
            Command::Status => {
                let report = self.bridge.status().await?;
                self.out.line(&format_status(&report));
                Ok(())
            }
            Command::Reset => {
                self.bridge.reset().await?;
                Ok(())
            }
            Command::Help => {
                self.out.line(&help_text());
                Ok(())
            }
        }
    }

    async fn run_files(&mut self, args: PlaybackArgs, check: bool) -> Result<()> {
        let programs = load_programs(&args.files)?;
        let mut session = self.bridge.control().await;

        let change = if check {
            let change = session.enable_check().await?;
            if change == ModeChange::Toggled {
                self.out.line("check mode enabled");
            }
            Some(change)
        } else {
            None
        };

        let summary = play(&mut session, &programs, args.continue_on_error, &mut self.out).await?;
        self.out.line(&summary.to_string());

        if change == Some(ModeChange::Toggled) {
            session.disable_check().await?;
            self.out.line("check mode disabled");
        }
        Ok(())
    }
}

/// `Check  MPos:0,0,0  WPos:0,0,0`
pub fn format_status(report: &StatusReport) -> String {
    let mut text = report.mode().to_string();
    for field in report.fields.iter().skip(1) {
        text.push_str("  ");
        text.push_str(field);
    }
    text
}
