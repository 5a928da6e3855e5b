//! Door agent against a fake hub on localhost UDP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use doorlink_agent::{AgentConfig, DoorAgent, DoorOutcome};
use doorlink_core::{Centimeters, Degrees, DoorState, ModuleId};
use doorlink_hardware::LedEvent;
use doorlink_hardware::mock::{
    MockActuatorHandle, MockDistanceSensor, MockLeds, MockLockActuator, MockSensorHandle,
};
use doorlink_network::UdpTransport;
use doorlink_protocol::Message;

const WAIT: Duration = Duration::from_millis(500);

struct FakeHub {
    notify: UdpTransport,
    heartbeat: UdpTransport,
}

impl FakeHub {
    async fn bind() -> Self {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        Self {
            notify: UdpTransport::bind(any).await.unwrap(),
            heartbeat: UdpTransport::bind(any).await.unwrap(),
        }
    }

    fn agent_config(&self, id: &str) -> AgentConfig {
        let mut config = AgentConfig::new(ModuleId::new(id).unwrap());
        config.bind_address = "127.0.0.1".parse().unwrap();
        config.listen_port = 0;
        // Long enough that periodic heartbeats stay out of the way.
        config.heartbeat_interval_ms = 60_000;
        config.hub.address = "127.0.0.1".parse().unwrap();
        config.hub.notify_port = self.notify.local_addr().unwrap().port();
        config.hub.heartbeat_port = self.heartbeat.local_addr().unwrap().port();
        config
    }

    async fn next_notify(&self) -> Option<String> {
        Self::next_line(&self.notify).await
    }

    async fn next_heartbeat(&self) -> Option<String> {
        Self::next_line(&self.heartbeat).await
    }

    async fn next_line(transport: &UdpTransport) -> Option<String> {
        transport
            .recv_timeout(WAIT)
            .await
            .unwrap()
            .and_then(|datagram| datagram.messages.first().map(ToString::to_string))
    }

    async fn command(&self, to: SocketAddr, id: &str, command_id: u64, target: &str, action: &str) {
        let message =
            Message::command(ModuleId::new(id).unwrap(), command_id, target, action).unwrap();
        self.notify.send_to(&message, to).await.unwrap();
    }
}

struct Fixture {
    hub: FakeHub,
    agent: DoorAgent<MockDistanceSensor, MockLockActuator>,
    sensor: MockSensorHandle,
    actuator: MockActuatorHandle,
    leds: MockLeds,
}

async fn closed_unlocked_door() -> Fixture {
    let hub = FakeHub::bind().await;
    let (sensor, sensor_handle) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, actuator_handle) = MockLockActuator::new(Degrees(0));
    let leds = MockLeds::new();

    let agent = DoorAgent::start(hub.agent_config("D1"), sensor, actuator, Arc::new(leds.clone()))
        .await
        .unwrap();

    assert_eq!(hub.next_notify().await.as_deref(), Some("D1 HELLO"));
    assert_eq!(
        hub.next_heartbeat().await.as_deref(),
        Some("D1 HEARTBEAT D0=CLOSED,UNLOCKED D1=CLOSED,UNLOCKED")
    );

    Fixture {
        hub,
        agent,
        sensor: sensor_handle,
        actuator: actuator_handle,
        leds,
    }
}

#[tokio::test]
async fn test_start_announces_module() {
    let f = closed_unlocked_door().await;

    assert!(f.agent.is_online());
    assert!(f.agent.local_addr().is_some());
    assert_eq!(f.agent.state().await, DoorState::Unlocked);

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_lock_command_is_executed_and_acknowledged() {
    let f = closed_unlocked_door().await;
    let agent_addr = f.agent.local_addr().unwrap();

    f.hub.command(agent_addr, "D1", 1, "D0", "LOCK").await;

    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 EVENT D0 LOCK LOCKED")
    );
    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 FEEDBACK 1 D0 LOCK")
    );
    assert_eq!(f.actuator.position(), Degrees(180));
    assert_eq!(f.agent.state().await, DoorState::Locked);
    assert!(f.leds.events().contains(&LedEvent::LockSuccess));

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_unknown_action_is_still_acknowledged() {
    let f = closed_unlocked_door().await;
    let agent_addr = f.agent.local_addr().unwrap();

    f.hub.command(agent_addr, "D1", 7, "D0", "OPEN_SESAME").await;

    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 FEEDBACK 7 D0 OPEN_SESAME")
    );
    assert!(f.actuator.rotations().is_empty());

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_refused_lock_is_acknowledged() {
    let f = closed_unlocked_door().await;
    let agent_addr = f.agent.local_addr().unwrap();
    f.sensor.set_distance(Centimeters(40));

    f.hub.command(agent_addr, "D1", 3, "D0", "LOCK").await;

    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 EVENT D0 DOOR OPEN")
    );
    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 FEEDBACK 3 D0 LOCK")
    );
    assert_eq!(f.agent.state().await, DoorState::Open);
    assert!(f.leds.events().contains(&LedEvent::LockFailure));

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_command_for_other_module_is_ignored() {
    let f = closed_unlocked_door().await;
    let agent_addr = f.agent.local_addr().unwrap();

    f.hub.command(agent_addr, "D2", 1, "D0", "LOCK").await;

    assert_eq!(f.hub.next_notify().await, None);
    assert!(f.actuator.rotations().is_empty());

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_local_unlock_reports_event() {
    let f = closed_unlocked_door().await;
    f.actuator.set_position(Degrees(180));

    // The hub last heard UNLOCKED; a status refresh brings it up to date.
    assert_eq!(f.agent.status().await, DoorOutcome::Status(DoorState::Locked));
    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 EVENT D0 LOCK LOCKED")
    );

    assert_eq!(f.agent.unlock().await, DoorOutcome::Moved(DoorState::Unlocked));
    assert_eq!(
        f.hub.next_notify().await.as_deref(),
        Some("D1 EVENT D0 LOCK UNLOCKED")
    );

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_sensor_fault_skips_report() {
    let f = closed_unlocked_door().await;
    f.sensor.set_faulty();

    assert_eq!(
        f.agent.status().await,
        DoorOutcome::Status(DoorState::Unknown)
    );
    assert_eq!(f.hub.next_notify().await, None);
    assert!(f.leds.events().contains(&LedEvent::DoorError));

    f.agent.shutdown().await;
}

#[tokio::test]
async fn test_periodic_heartbeat() {
    let hub = FakeHub::bind().await;
    let mut config = hub.agent_config("D1");
    config.heartbeat_interval_ms = 50;

    let (sensor, _sensor) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, _actuator) = MockLockActuator::new(Degrees(180));
    let agent = DoorAgent::start(config, sensor, actuator, Arc::new(MockLeds::new()))
        .await
        .unwrap();

    for _ in 0..3 {
        assert_eq!(
            hub.next_heartbeat().await.as_deref(),
            Some("D1 HEARTBEAT D0=CLOSED,LOCKED D1=CLOSED,LOCKED")
        );
    }

    agent.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_runs_offline() {
    let occupied = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let hub = FakeHub::bind().await;
    let mut config = hub.agent_config("D1");
    config.listen_port = occupied.local_addr().unwrap().port();

    let (sensor, _sensor) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, actuator_handle) = MockLockActuator::new(Degrees(0));
    let leds = MockLeds::new();
    let agent = DoorAgent::start(config, sensor, actuator, Arc::new(leds.clone()))
        .await
        .unwrap();

    assert!(!agent.is_online());
    assert_eq!(agent.local_addr(), None);
    assert_eq!(leds.events().first(), Some(&LedEvent::NetworkError));

    assert_eq!(agent.lock().await, DoorOutcome::Moved(DoorState::Locked));
    assert_eq!(actuator_handle.position(), Degrees(180));
    assert_eq!(hub.next_notify().await, None);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let hub = FakeHub::bind().await;
    let mut config = hub.agent_config("D1");
    config.heartbeat_interval_ms = 0;

    let (sensor, _) = MockDistanceSensor::new(Centimeters(4));
    let (actuator, _) = MockLockActuator::new(Degrees(0));
    let result = DoorAgent::start(config, sensor, actuator, Arc::new(MockLeds::new())).await;

    assert!(result.is_err());
}
