use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller state, taken from the first field of a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Idle,
    Run,
    Hold,
    Jog,
    Alarm,
    Door,
    Check,
    Home,
    Sleep,
    /// Firmware reported a state this console does not know about.
    Other(String),
}

impl Mode {
    /// Parse a mode field. Sub-state suffixes (`Hold:0`, `Door:1`) are ignored.
    pub fn parse(field: &str) -> Self {
        let name = field.split(':').next().unwrap_or(field).trim();
        match name {
            "Idle" => Mode::Idle,
            "Run" => Mode::Run,
            "Hold" => Mode::Hold,
            "Jog" => Mode::Jog,
            "Alarm" => Mode::Alarm,
            "Door" => Mode::Door,
            "Check" => Mode::Check,
            "Home" => Mode::Home,
            "Sleep" => Mode::Sleep,
            other => Mode::Other(other.to_string()),
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self, Mode::Check)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => f.write_str("Idle"),
            Mode::Run => f.write_str("Run"),
            Mode::Hold => f.write_str("Hold"),
            Mode::Jog => f.write_str("Jog"),
            Mode::Alarm => f.write_str("Alarm"),
            Mode::Door => f.write_str("Door"),
            Mode::Check => f.write_str("Check"),
            Mode::Home => f.write_str("Home"),
            Mode::Sleep => f.write_str("Sleep"),
            Mode::Other(name) => f.write_str(name),
        }
    }
}

/// A parsed real-time status report.
///
/// Two wire formats exist:
///
/// ```text
/// <Idle|MPos:0.000,0.000,0.000|FS:0,0>        (1.1, fields split on '|')
/// <Idle,MPos:0.000,0.000,0.000,WPos:0,0,0>    (0.9, fields split on ',')
/// ```
///
/// In the comma form, coordinate values also contain commas, so a segment
/// without a `:` is glued back onto the field before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub fields: Vec<String>,
}

impl StatusReport {
    pub fn parse(line: &str) -> Self {
        let body = line
            .trim()
            .trim_start_matches(['<', '['])
            .trim_end_matches(['>', ']']);

        if body.is_empty() {
            return Self { fields: Vec::new() };
        }

        if body.contains('|') {
            return Self {
                fields: body.split('|').map(str::to_string).collect(),
            };
        }

        let mut segments = body.split(',');
        let mut fields: Vec<String> = segments.next().map(str::to_string).into_iter().collect();
        for segment in segments {
            // Never glue onto the mode field.
            let continuation = !segment.contains(':') && fields.len() > 1;
            match fields.last_mut() {
                Some(prev) if continuation => {
                    prev.push(',');
                    prev.push_str(segment);
                }
                _ => fields.push(segment.to_string()),
            }
        }
        Self { fields }
    }

    /// Mode named by the first field.
    pub fn mode(&self) -> Mode {
        self.fields
            .first()
            .map(|f| Mode::parse(f))
            .unwrap_or_else(|| Mode::Other(String::new()))
    }

    /// Look up a `Name:value` field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().skip(1).find_map(|f| {
            f.split_once(':')
                .filter(|(key, _)| *key == name)
                .map(|(_, value)| value)
        })
    }
}
