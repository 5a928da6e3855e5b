//! doorlink - run a hub or a simulated door module from the command line.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::{AGENT_HELP, AgentCommand, HUB_HELP, HubCommand};
use doorlink_agent::{AgentConfig, DoorAgent};
use doorlink_core::{Centimeters, ModuleId};
use doorlink_hardware::mock::{MockDistanceSensor, MockLockActuator, MockSensorHandle};
use doorlink_hardware::{LedEvent, LedPatterns, LedWorker};
use doorlink_hub::{AlertWorker, Hub, HubConfig, ModuleStatus, TracingDelivery};

#[derive(Parser, Debug)]
#[command(name = "doorlink")]
#[command(about = "Door access control hub and module agent", long_about = None)]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the hub with an interactive console
    Hub {
        /// Hub configuration file (TOML); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a door module on simulated hardware with an interactive console
    Agent {
        /// Agent configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Module id used when no configuration file is given
        #[arg(long, default_value = "D1")]
        module_id: ModuleId,
    },

    /// Print or write a configuration file with every default filled in
    GenConfig {
        #[arg(value_enum)]
        kind: ConfigKind,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module id written into an agent configuration
        #[arg(long, default_value = "D1")]
        module_id: ModuleId,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConfigKind {
    Hub,
    Agent,
}

/// LED board stand-in that logs each pattern.
struct LoggedLeds {
    board: &'static str,
}

impl LedPatterns for LoggedLeds {
    async fn play(&mut self, event: LedEvent) -> doorlink_hardware::Result<()> {
        info!(board = self.board, %event, "LED");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Command::Hub { config } => run_hub(config).await,
        Command::Agent { config, module_id } => run_agent(config, module_id).await,
        Command::GenConfig {
            kind,
            output,
            module_id,
        } => gen_config(kind, output, module_id),
    }
}

async fn run_hub(path: Option<PathBuf>) -> Result<()> {
    let config = match path {
        Some(path) => HubConfig::from_file(&path)
            .with_context(|| format!("loading hub config {}", path.display()))?,
        None => HubConfig::default(),
    };

    let (alerts, alert_worker) = AlertWorker::spawn(TracingDelivery, config.alert_queue_capacity);
    let (leds, led_worker) = LedWorker::spawn(LoggedLeds { board: "hub" }, config.led_queue_capacity);
    let hub = Hub::start(config, Arc::new(alerts), Arc::new(leds)).await?;

    println!("{HUB_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        let command = match console::parse_hub(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e:#}");
                continue;
            }
        };

        match command {
            HubCommand::Status(module_id) => match hub.get_status(&module_id) {
                Some(status) => print_status(&status),
                None => println!("{module_id}: not tracked"),
            },
            HubCommand::Modules => {
                for status in hub.modules() {
                    print_status(&status);
                }
            }
            HubCommand::History(max_n) => {
                for event in hub.get_history(max_n) {
                    println!("{event}");
                }
            }
            HubCommand::Send {
                module_id,
                target,
                action,
            } => match hub.send_command(&module_id, &target, &action).await {
                Ok(ack) => println!(
                    "command {} acknowledged after {} attempt(s)",
                    ack.command_id, ack.attempts
                ),
                Err(e) => println!("command failed ({}): {e}", e.reason()),
            },
            HubCommand::Help => println!("{HUB_HELP}"),
            HubCommand::Quit => break,
        }
    }

    hub.shutdown().await;
    alert_worker.shutdown().await;
    led_worker.shutdown().await;
    Ok(())
}

fn print_status(status: &ModuleStatus) {
    let heartbeat = status
        .last_heartbeat_at
        .map_or_else(|| "never".to_string(), |at| format!("{:.1?} ago", at.elapsed()));
    println!(
        "{} {} D0={},{} D1={},{} heartbeat={} addr={}",
        status.module_id,
        if status.online { "ONLINE" } else { "OFFLINE" },
        open_word(status.door_open),
        lock_word(status.lock_locked),
        open_word(status.d1_open),
        lock_word(status.d1_locked),
        heartbeat,
        status
            .last_addr
            .map_or_else(|| "-".to_string(), |addr| addr.to_string()),
    );
}

fn open_word(open: bool) -> &'static str {
    if open { "OPEN" } else { "CLOSED" }
}

fn lock_word(locked: bool) -> &'static str {
    if locked { "LOCKED" } else { "UNLOCKED" }
}

async fn run_agent(path: Option<PathBuf>, module_id: ModuleId) -> Result<()> {
    let config = match path {
        Some(path) => AgentConfig::from_file(&path)
            .with_context(|| format!("loading agent config {}", path.display()))?,
        None => AgentConfig::new(module_id),
    };

    let threshold = config.door.closed_threshold();
    let (sensor, sensor_handle) = MockDistanceSensor::new(closed_reading(threshold));
    let (actuator, _actuator) = MockLockActuator::new(config.door.unlocked_position());
    let (leds, led_worker) = LedWorker::spawn(LoggedLeds { board: "module" }, config.led_queue_capacity);

    let agent = DoorAgent::start(config, sensor, actuator, Arc::new(leds)).await?;
    if !agent.is_online() {
        warn!("Running offline; nothing will reach the hub");
    }

    println!("{AGENT_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        let command = match console::parse_agent(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e:#}");
                continue;
            }
        };

        match command {
            AgentCommand::Lock => println!("{:?}", agent.lock().await),
            AgentCommand::Unlock => println!("{:?}", agent.unlock().await),
            AgentCommand::Status => println!("{:?}", agent.status().await),
            AgentCommand::Open => move_leaf(&sensor_handle, open_reading(threshold)),
            AgentCommand::Close => move_leaf(&sensor_handle, closed_reading(threshold)),
            AgentCommand::Help => println!("{AGENT_HELP}"),
            AgentCommand::Quit => break,
        }
    }

    agent.shutdown().await;
    led_worker.shutdown().await;
    Ok(())
}

fn closed_reading(threshold: Centimeters) -> Centimeters {
    Centimeters(threshold.get() / 2)
}

fn open_reading(threshold: Centimeters) -> Centimeters {
    Centimeters(threshold.get().saturating_mul(4))
}

fn move_leaf(sensor: &MockSensorHandle, distance: Centimeters) {
    sensor.set_distance(distance);
    println!("sensor now reads {distance}");
}

fn gen_config(kind: ConfigKind, output: Option<PathBuf>, module_id: ModuleId) -> Result<()> {
    let contents = match kind {
        ConfigKind::Hub => HubConfig::default().to_toml()?,
        ConfigKind::Agent => AgentConfig::new(module_id).to_toml()?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, contents)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Configuration written");
        }
        None => print!("{contents}"),
    }
    Ok(())
}
