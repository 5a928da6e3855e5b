//! Tolerant parser for doorlink protocol lines.
//!
//! Door modules run on small firmware and the network is lossy, so the parser
//! accepts anything it can make sense of and only rejects lines it cannot
//! attribute to a module.
//!
//! # Rules
//!
//! - A line with fewer than two tokens, or whose first token is not a valid
//!   module id, is rejected. Callers drop such lines silently.
//! - Unknown type tokens become [`MessageKind::Other`].
//! - A known type with missing or unusable arguments also becomes
//!   [`MessageKind::Other`], so the hub can still record that the module spoke.
//! - HEARTBEAT state tokens are read leniently: `D0=OPEN,LOCKED`,
//!   `D0=LOCKED` and `D0=CLOSED` are all accepted; unrecognised halves are
//!   left absent.
//!
//! # Examples
//!
//! ```
//! use doorlink_protocol::{MessageKind, MessageParser};
//!
//! let msg = MessageParser::parse("D1 EVENT D0 DOOR OPEN").unwrap();
//! assert_eq!(msg.module_id.as_str(), "D1");
//! assert!(matches!(msg.kind, MessageKind::Event { .. }));
//!
//! // Malformed EVENT is kept as an opaque message.
//! let msg = MessageParser::parse("D1 EVENT D0 DOOR LOCKED").unwrap();
//! assert!(matches!(msg.kind, MessageKind::Other { .. }));
//!
//! // Too short to attribute: rejected.
//! assert!(MessageParser::parse("D1").is_err());
//! ```

use crate::message::{ChannelReport, Message, MessageKind};
use doorlink_core::{Channel, Error, ModuleId, Point, PointState, Result};

/// Parser for single protocol lines.
pub struct MessageParser;

impl MessageParser {
    /// Parse one line (with or without its trailing newline).
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` when the line has fewer than two
    /// tokens and `Error::InvalidModuleId` when the first token is not a
    /// valid module id.
    pub fn parse(line: &str) -> Result<Message> {
        let mut tokens = line.split_whitespace();

        let (Some(id), Some(kind)) = (tokens.next(), tokens.next()) else {
            return Err(Error::invalid_format(format!(
                "Expected '<module_id> <TYPE> ...', got {line:?}"
            )));
        };

        let module_id = ModuleId::new(id)?;
        let args: Vec<&str> = tokens.collect();

        let parsed = match kind {
            "HELLO" => Some(MessageKind::Hello),
            "EVENT" => Self::parse_event(&args),
            "HEARTBEAT" => Some(Self::parse_heartbeat(&args)),
            "COMMAND" => Self::parse_command_fields(&args).map(|(command_id, target, action)| {
                MessageKind::Command {
                    command_id,
                    target,
                    action,
                }
            }),
            "FEEDBACK" => Self::parse_command_fields(&args).map(|(command_id, target, action)| {
                MessageKind::Feedback {
                    command_id,
                    target,
                    action,
                }
            }),
            _ => None,
        };

        let kind = parsed.unwrap_or_else(|| MessageKind::Other {
            kind: kind.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        });

        Ok(Message::new(module_id, kind))
    }

    fn parse_event(args: &[&str]) -> Option<MessageKind> {
        let [channel, point, state, ..] = args else {
            return None;
        };

        let channel: Channel = channel.parse().ok()?;
        let point: Point = point.parse().ok()?;
        let state: PointState = state.parse().ok()?;

        point.accepts(state).then_some(MessageKind::Event {
            channel,
            point,
            state,
        })
    }

    fn parse_heartbeat(args: &[&str]) -> MessageKind {
        let mut d0 = ChannelReport::default();
        let mut d1 = ChannelReport::default();

        for token in args {
            let Some((name, values)) = token.split_once('=') else {
                continue;
            };
            let report = match name {
                "D0" => &mut d0,
                "D1" => &mut d1,
                _ => continue,
            };
            Self::apply_report_values(report, values);
        }

        MessageKind::Heartbeat { d0, d1 }
    }

    fn apply_report_values(report: &mut ChannelReport, values: &str) {
        for value in values.split(',') {
            match value.parse::<PointState>() {
                Ok(PointState::Open) => report.open = Some(true),
                Ok(PointState::Closed) => report.open = Some(false),
                Ok(PointState::Locked) => report.locked = Some(true),
                Ok(PointState::Unlocked) => report.locked = Some(false),
                Err(_) => {}
            }
        }
    }

    fn parse_command_fields(args: &[&str]) -> Option<(u64, String, String)> {
        let [id, target, action, ..] = args else {
            return None;
        };
        let command_id = id.parse::<u64>().ok()?;
        Some((command_id, target.to_string(), action.to_string()))
    }
}
