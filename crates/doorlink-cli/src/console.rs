//! Interactive console commands read from stdin.

use anyhow::{Context, Result, bail};
use doorlink_core::ModuleId;

pub const HUB_HELP: &str = "\
commands:
  status <module>                 last known state of a module
  modules                         every tracked module
  history [n]                     most recent history entries (default 20)
  send <module> <target> <action> send a COMMAND and wait for its FEEDBACK
  quit";

pub const AGENT_HELP: &str = "\
commands:
  lock | unlock | status          operate the door
  open | close                    move the simulated door leaf
  quit";

const DEFAULT_HISTORY_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCommand {
    Status(ModuleId),
    Modules,
    History(usize),
    Send {
        module_id: ModuleId,
        target: String,
        action: String,
    },
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    Lock,
    Unlock,
    Status,
    Open,
    Close,
    Help,
    Quit,
}

/// Parse one hub console line. Blank lines yield `None`.
pub fn parse_hub(line: &str) -> Result<Option<HubCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["status", id] => HubCommand::Status(module_id(id)?),
        ["modules"] => HubCommand::Modules,
        ["history"] => HubCommand::History(DEFAULT_HISTORY_LINES),
        ["history", n] => HubCommand::History(
            n.parse()
                .with_context(|| format!("invalid history length {n:?}"))?,
        ),
        ["send", id, target, action] => HubCommand::Send {
            module_id: module_id(id)?,
            target: (*target).to_string(),
            action: action.to_ascii_uppercase(),
        },
        ["help"] => HubCommand::Help,
        ["quit" | "exit"] => HubCommand::Quit,
        [other, ..] => bail!("unknown command {other:?}, try \"help\""),
    };
    Ok(Some(command))
}

/// Parse one agent console line. Blank lines yield `None`.
pub fn parse_agent(line: &str) -> Result<Option<AgentCommand>> {
    let command = match line.trim() {
        "" => return Ok(None),
        "lock" => AgentCommand::Lock,
        "unlock" => AgentCommand::Unlock,
        "status" => AgentCommand::Status,
        "open" => AgentCommand::Open,
        "close" => AgentCommand::Close,
        "help" => AgentCommand::Help,
        "quit" | "exit" => AgentCommand::Quit,
        other => bail!("unknown command {other:?}, try \"help\""),
    };
    Ok(Some(command))
}

fn module_id(id: &str) -> Result<ModuleId> {
    ModuleId::new(id).with_context(|| format!("invalid module id {id:?}"))
}
