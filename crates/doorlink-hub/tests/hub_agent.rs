//! Hub and door agent talking over localhost UDP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use doorlink_agent::{AgentConfig, DoorAgent};
use doorlink_core::{Centimeters, Degrees, DoorState, ModuleId};
use doorlink_hardware::LedEvent;
use doorlink_hardware::mock::{MockDistanceSensor, MockLeds, MockLockActuator};
use doorlink_hub::{AlertSink, DispatchError, Hub, HubConfig, ModuleStatus};
use doorlink_network::UdpTransport;
use doorlink_protocol::Message;

#[derive(Default)]
struct Alerts(Mutex<Vec<String>>);

impl AlertSink for Alerts {
    fn notify(&self, text: String) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(text);
    }
}

impl Alerts {
    fn texts(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn hub_config() -> HubConfig {
    HubConfig {
        bind_address: "127.0.0.1".parse().unwrap(),
        notify_port: 0,
        heartbeat_port: 0,
        ..HubConfig::default()
    }
}

fn agent_config(hub: &Hub, id: &str) -> AgentConfig {
    let mut config = AgentConfig::new(ModuleId::new(id).unwrap());
    config.bind_address = "127.0.0.1".parse().unwrap();
    config.listen_port = 0;
    config.hub.address = "127.0.0.1".parse().unwrap();
    config.hub.notify_port = hub.notify_addr().port();
    config.hub.heartbeat_port = hub.heartbeat_addr().port();
    config
}

fn id(s: &str) -> ModuleId {
    ModuleId::new(s).unwrap()
}

/// Poll the hub until `check` holds for the module's status.
async fn wait_for_status(
    hub: &Hub,
    module: &str,
    check: impl Fn(&ModuleStatus) -> bool,
) -> ModuleStatus {
    for _ in 0..200 {
        if let Some(status) = hub.get_status(&id(module))
            && check(&status)
        {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("module {module} never reached the expected state");
}

#[tokio::test]
async fn test_heartbeat_then_acknowledged_unlock() {
    let alerts = Arc::new(Alerts::default());
    let hub_leds = MockLeds::new();
    let hub = Hub::start(hub_config(), alerts.clone(), Arc::new(hub_leds.clone()))
        .await
        .unwrap();

    let (sensor, _sensor) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, actuator_handle) = MockLockActuator::new(Degrees(180));
    let agent = DoorAgent::start(
        agent_config(&hub, "D1"),
        sensor,
        actuator,
        Arc::new(MockLeds::new()),
    )
    .await
    .unwrap();

    let status = wait_for_status(&hub, "D1", |s| s.last_heartbeat_at.is_some()).await;
    assert!(!status.door_open);
    assert!(status.lock_locked);
    assert!(status.online);
    assert_eq!(status.last_addr, agent.local_addr());

    let ack = hub.send_command(&id("D1"), "D0", "UNLOCK").await.unwrap();
    assert_eq!(ack.command_id, 1);
    assert_eq!(ack.attempts, 1);
    assert_eq!(hub_leds.events(), [LedEvent::HubCmdSuccess]);

    assert_eq!(actuator_handle.position(), Degrees(0));
    assert_eq!(agent.state().await, DoorState::Unlocked);

    let status = wait_for_status(&hub, "D1", |s| !s.lock_locked).await;
    let feedback = status.last_feedback.unwrap();
    assert_eq!(feedback.command_id, 1);
    assert_eq!(feedback.target, "D0");
    assert_eq!(feedback.action, "UNLOCK");
    assert!(alerts.texts().contains(&"[D1] D0 LOCK is now UNLOCKED".to_string()));

    let history: Vec<String> = hub.get_history(64).into_iter().map(|e| e.text).collect();
    assert!(history.contains(&"D1 HELLO".to_string()));
    assert!(history.contains(&"D1 FEEDBACK 1 D0 UNLOCK".to_string()));

    agent.shutdown().await;
    hub.shutdown().await;
}

#[tokio::test]
async fn test_silent_module_goes_offline_once() {
    let alerts = Arc::new(Alerts::default());
    let config = HubConfig {
        offline_timeout_ms: 300,
        sweep_interval_ms: 20,
        ..hub_config()
    };
    let hub = Hub::start(config, alerts.clone(), Arc::new(MockLeds::new()))
        .await
        .unwrap();

    let mut agent_config = agent_config(&hub, "D1");
    agent_config.heartbeat_interval_ms = 50;
    let (sensor, _sensor) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, _actuator) = MockLockActuator::new(Degrees(0));
    let agent = DoorAgent::start(agent_config, sensor, actuator, Arc::new(MockLeds::new()))
        .await
        .unwrap();

    wait_for_status(&hub, "D1", |s| s.last_heartbeat_at.is_some()).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(hub.get_status(&id("D1")).unwrap().online);

    agent.shutdown().await;
    wait_for_status(&hub, "D1", |s| !s.online).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let offline: Vec<_> = alerts
        .texts()
        .into_iter()
        .filter(|t| t.contains("MODULE SYSTEM"))
        .collect();
    assert_eq!(offline, ["[D1] MODULE SYSTEM is now OFFLINE"]);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_command_to_vanished_module_fails() {
    let hub_leds = MockLeds::new();
    let config = HubConfig {
        commands: doorlink_hub::CommandConfig {
            ack_timeout_ms: 50,
            retries: 1,
        },
        ..hub_config()
    };
    let hub = Hub::start(config, Arc::new(Alerts::default()), Arc::new(hub_leds.clone()))
        .await
        .unwrap();

    // A module that announces itself and never answers.
    let module = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    module
        .send_to(&Message::hello(id("D5")), hub.notify_addr())
        .await
        .unwrap();
    wait_for_status(&hub, "D5", |s| s.last_addr.is_some()).await;

    let err = hub.send_command(&id("D5"), "D0", "LOCK").await.unwrap_err();
    assert!(matches!(err, DispatchError::NoAck { attempts: 2 }));
    assert_eq!(
        hub_leds.events(),
        [LedEvent::HubCmdFailure, LedEvent::NetworkError]
    );

    let err = hub.send_command(&id("NOPE"), "D0", "LOCK").await.unwrap_err();
    assert_eq!(err.reason(), "unknown_module");

    hub.shutdown().await;
}

#[tokio::test]
async fn test_full_table_and_shared_socket() {
    let probe = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let config = HubConfig {
        notify_port: port,
        heartbeat_port: port,
        max_modules: 1,
        ..hub_config()
    };
    let hub = Hub::start(config, Arc::new(Alerts::default()), Arc::new(MockLeds::new()))
        .await
        .unwrap();
    assert_eq!(hub.notify_addr(), hub.heartbeat_addr());

    let module = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let dest: SocketAddr = hub.notify_addr();
    for line in ["A HELLO", "B HELLO"] {
        let message = doorlink_protocol::MessageParser::parse(line).unwrap();
        module.send_to(&message, dest).await.unwrap();
    }

    wait_for_status(&hub, "A", |_| true).await;
    for _ in 0..200 {
        if hub.get_history(10).len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(hub.get_status(&id("B")).is_none());
    let history = hub.get_history(10);
    assert_eq!(history[1].module_id, id("B"));
    assert_eq!(history[1].text, "<NO-STATE> (untracked)");

    hub.shutdown().await;
}
