use crate::mock_transport::Responder;
use core_types::Mode;
use framing::LineFramer;
use std::collections::HashMap;

pub const FAKE_BANNER: &str = "Grbl 1.1f ['$' for help]";

const STATUS_QUERY: u8 = b'?';
const SOFT_RESET: u8 = 0x18;

/// A small model of the firmware's serial behaviour.
///
/// - `?` is a real-time byte: answered at once with a legacy status report
/// - `0x18` resets: leaves check mode and prints the banner
/// - `$C` toggles check mode: `[Enabled]`/`[Disabled]` then `ok`
/// - any other line (including an empty one) is acknowledged with `ok`,
///   unless registered with [`FakeGrbl::fail_line`]
pub struct FakeGrbl {
    framer: LineFramer,
    mode: Mode,
    failures: HashMap<String, u32>,
    check_toggle_reply: Option<Vec<String>>,
    received: Vec<String>,
}

impl FakeGrbl {
    pub fn new() -> Self {
        Self {
            framer: LineFramer::new(),
            mode: Mode::Idle,
            failures: HashMap::new(),
            check_toggle_reply: None,
            received: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Answer `line` with `error:<code>` instead of `ok`.
    pub fn fail_line(mut self, line: &str, code: u32) -> Self {
        self.failures.insert(line.to_string(), code);
        self
    }

    /// Replace the reply to `$C` (the mode still toggles).
    pub fn with_check_toggle_reply(mut self, lines: &[&str]) -> Self {
        self.check_toggle_reply = Some(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Command lines received so far (real-time bytes excluded).
    pub fn received(&self) -> &[String] {
        &self.received
    }

    fn status_report(&self) -> String {
        format!("<{},MPos:0.000,0.000,0.000,WPos:0.000,0.000,0.000>", self.mode)
    }

    fn handle_line(&mut self, line: &str) -> Vec<String> {
        self.received.push(line.to_string());

        if line == "$C" {
            let enabling = !self.mode.is_check();
            self.mode = if enabling { Mode::Check } else { Mode::Idle };
            if let Some(reply) = &self.check_toggle_reply {
                return reply.clone();
            }
            let message = if enabling { "[Enabled]" } else { "[Disabled]" };
            return vec![message.to_string(), "ok".to_string()];
        }

        match self.failures.get(line) {
            Some(code) => vec![format!("error:{}", code)],
            None => vec!["ok".to_string()],
        }
    }
}

impl Default for FakeGrbl {
    fn default() -> Self {
        Self::new()
    }
}

impl Responder for FakeGrbl {
    fn respond(&mut self, written: &[u8]) -> Vec<Vec<u8>> {
        let mut replies = Vec::new();

        for &b in written {
            match b {
                STATUS_QUERY => replies.push(self.status_report()),
                SOFT_RESET => {
                    self.framer.reset();
                    self.mode = Mode::Idle;
                    replies.push(String::new());
                    replies.push(FAKE_BANNER.to_string());
                }
                b'\r' => {}
                _ => {
                    for record in self.framer.push(&[b]) {
                        let line = String::from_utf8_lossy(&record).trim().to_string();
                        replies.extend(self.handle_line(&line));
                    }
                }
            }
        }

        replies
            .into_iter()
            .map(|line| format!("{}\r\n", line).into_bytes())
            .collect()
    }
}
