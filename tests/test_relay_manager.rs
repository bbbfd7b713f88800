//! Integration tests for the relay manager feeding the DSU server

use std::time::Duration;

use padrelay_rs::controller::{ControllerFrame, DeviceFamily, MotionSample};
use padrelay_rs::inputs::{ButtonFlag, Vec3};
use padrelay_rs::power::{MockPower, PowerStatus};
use padrelay_rs::{DsuServer, MockController, RelayManager, ServerConfig};

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        poll_interval_ms: 5,
        ..ServerConfig::default()
    }
}

async fn bind_server(config: &ServerConfig) -> DsuServer {
    DsuServer::bind(config, Box::new(MockPower::new(PowerStatus::High)))
        .await
        .unwrap()
}

#[tokio::test]
async fn polled_frames_reach_the_server() {
    let config = test_config();
    let server = bind_server(&config).await;

    let mut pad = MockController::new(DeviceFamily::XInput);
    let mut frame = ControllerFrame::default();
    frame.buttons.set(ButtonFlag::B2, true);
    frame.motion = Some(MotionSample {
        accelerometer: Vec3::new(0.0, 1.0, 0.0),
        gyroscope: Vec3::new(5.0, 0.0, 0.0),
        timestamp_us: 9_000,
    });
    pad.push_frame(frame);

    let manager = RelayManager::new(server.clone(), &config);
    manager.add_controller(Box::new(pad));
    manager.start().unwrap();

    // wait for the poll -> channel -> push pipeline to land the frame
    let mut landed = false;
    for _ in 0..200 {
        let snapshot = server.snapshot_inputs();
        if snapshot.buttons.get(ButtonFlag::B2) {
            assert_eq!(snapshot.motion_timestamp, 9_000);
            landed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    manager.stop();
    assert!(landed, "frame never reached the server");
}

#[tokio::test]
async fn disconnected_controller_stops_contributing() {
    let config = test_config();
    let server = bind_server(&config).await;

    let mut pad = MockController::new(DeviceFamily::Neptune);
    let connection = pad.connection_handle();
    let mut frame = ControllerFrame::default();
    frame.buttons.set(ButtonFlag::Special, true);
    pad.push_frame(frame);

    let manager = RelayManager::new(server.clone(), &config);
    manager.add_controller(Box::new(pad));
    manager.start().unwrap();

    for _ in 0..200 {
        if server.snapshot_inputs().buttons.get(ButtonFlag::Special) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(server.snapshot_inputs().buttons.get(ButtonFlag::Special));

    // unplug: subsequent frames no longer carry the button
    connection.store(false, std::sync::atomic::Ordering::SeqCst);
    let mut released = false;
    for _ in 0..200 {
        if !server.snapshot_inputs().buttons.get(ButtonFlag::Special) {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    manager.stop();
    assert!(released, "disconnected pad kept raising state");
}

#[tokio::test]
async fn starting_twice_is_an_error() {
    let config = test_config();
    let server = bind_server(&config).await;

    let manager = RelayManager::new(server, &config);
    manager.start().unwrap();
    assert!(manager.is_running());
    assert!(manager.start().is_err());
    manager.stop();
    assert!(!manager.is_running());
}
