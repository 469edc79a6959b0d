//! Synchronous file playback for `%run` and `%check`.
//!
//! Files are read completely before anything is sent, so a missing file is
//! reported without touching the controller. Each line is then written inside
//! one control transaction and its `ok`/`error:<n>` awaited before the next
//! one goes out.

use crate::errors::{ConsoleError, Result};
use crate::output::Output;
use bridge::{Ack, BridgeError, ControlSession, Transport};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file's command lines, trailing whitespace stripped, blank lines dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl Program {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConsoleError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            path: path.to_path_buf(),
            lines,
        }
    }
}

pub fn load_programs(paths: &[PathBuf]) -> Result<Vec<Program>> {
    paths.iter().map(|p| Program::load(p)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Lines the controller acknowledged with `ok`
    pub accepted: usize,
    /// Lines answered with `error:<n>` or refused before sending
    pub rejected: usize,
    /// Playback ended early on a rejected line
    pub stopped: bool,
}

impl std::fmt::Display for PlaybackSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ok, {} error", self.accepted, self.rejected)?;
        if self.stopped {
            f.write_str(" (stopped at first error, use -c to continue past errors)")?;
        }
        Ok(())
    }
}

/// Play `programs` line by line. Only fatal bridge errors are returned;
/// rejected lines are reported on `out` and counted.
pub async fn play<T: Transport>(
    session: &mut ControlSession<'_, T>,
    programs: &[Program],
    continue_on_error: bool,
    out: &mut dyn Output,
) -> std::result::Result<PlaybackSummary, BridgeError> {
    let mut summary = PlaybackSummary::default();

    'files: for program in programs {
        info!(file = %program.path.display(), lines = program.lines.len(), "playing file");
        for line in &program.lines {
            let outcome = match session.command(line).await {
                Ok(outcome) => outcome,
                Err(BridgeError::NonAscii(_)) => {
                    warn!(line = %line, "skipping non-ASCII line");
                    out.line(&format!("{} ... not sent: non-ASCII characters", line));
                    summary.rejected += 1;
                    if continue_on_error {
                        continue;
                    }
                    summary.stopped = true;
                    break 'files;
                }
                Err(e) => return Err(e),
            };

            for feedback in &outcome.feedback {
                out.line(feedback.as_str());
            }
            out.line(&format!("{} ... {}", line, outcome.ack));

            match outcome.ack {
                Ack::Ok => summary.accepted += 1,
                Ack::Error(_) => {
                    summary.rejected += 1;
                    if !continue_on_error {
                        summary.stopped = true;
                        break 'files;
                    }
                }
            }
        }
    }

    debug!(?summary, "playback finished");
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::output::BufferOutput;
    use bridge::{Bridge, BridgeConfig};
    use test_harness::{FakeGrbl, MockTransport};

    fn program(text: &str) -> Program {
        Program::from_text(Path::new("part.nc"), text)
    }

    #[test]
    fn test_program_drops_blank_lines() {
        let p = program("G21\r\n\n   \nG0 X1  \n");
        assert_eq!(p.lines, vec!["G21", "G0 X1"]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_programs(&[PathBuf::from("/nonexistent/part.nc")]).unwrap_err();
        assert!(matches!(err, ConsoleError::File { .. }));
    }

    #[tokio::test]
    async fn test_stops_at_first_error() {
        let (transport, handle) =
            MockTransport::with_responder(FakeGrbl::new().fail_line("G5", 20));
        let bridge = Bridge::new(transport, BridgeConfig::new("mock", 115_200));
        let out = BufferOutput::new();

        let summary = {
            let mut session = bridge.control().await;
            play(&mut session, &[program("G21\nG5\nG0 X1\n")], false, &mut out.clone())
                .await
                .unwrap()
        };

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert!(summary.stopped);
        assert_eq!(handle.written_text(), "G21\nG5\n");
        assert_eq!(out.lines(), vec!["G21 ... ok", "G5 ... error:20"]);
    }

    #[tokio::test]
    async fn test_continue_on_error() {
        let (transport, handle) =
            MockTransport::with_responder(FakeGrbl::new().fail_line("G5", 20));
        let bridge = Bridge::new(transport, BridgeConfig::new("mock", 115_200));
        let mut out = BufferOutput::new();

        let mut session = bridge.control().await;
        let summary = play(
            &mut session,
            &[program("G5\nG0 X1\n"), program("G0 Y1\n")],
            true,
            &mut out,
        )
        .await
        .unwrap();
        drop(session);

        assert_eq!(
            summary,
            PlaybackSummary {
                accepted: 2,
                rejected: 1,
                stopped: false
            }
        );
        assert_eq!(handle.written_text(), "G5\nG0 X1\nG0 Y1\n");
        assert_eq!(bridge.replies().default_len(), 0);
    }

    #[tokio::test]
    async fn test_non_ascii_line_not_sent() {
        let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
        let bridge = Bridge::new(transport, BridgeConfig::new("mock", 115_200));
        let mut out = BufferOutput::new();

        let mut session = bridge.control().await;
        let summary = play(&mut session, &[program("G0 X1 (über)\nG0 X2\n")], false, &mut out)
            .await
            .unwrap();

        assert!(summary.stopped);
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn test_summary_display() {
        let summary = PlaybackSummary {
            accepted: 3,
            rejected: 1,
            stopped: true,
        };
        assert!(summary.to_string().starts_with("3 ok, 1 error"));
    }
}
