//! DSU relay - main application
//!
//! Binds the DSU server, wires a controller source into it and drives the
//! broadcast tick. Point a DSU-capable emulator at this host, port 26760.
//!
//! Physical device backends plug in through the `Controller` trait; until
//! one is wired up this binary feeds the relay from a mock pad so consumers
//! can be pointed at it end to end.

use anyhow::Context;
use padrelay_rs::controller::DeviceFamily;
use padrelay_rs::power::HostPower;
use padrelay_rs::{DsuServer, MockController, RelayManager, ServerConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load_default().context("loading server config")?;

    let server = DsuServer::bind(&config, Box::new(HostPower::new()))
        .await
        .context("starting DSU server")?;
    server.start();

    let manager = RelayManager::new(server.clone(), &config);
    manager.add_controller(Box::new(MockController::new(DeviceFamily::XInput)));
    manager.start().context("starting relay manager")?;

    println!("DSU relay listening on {}", server.local_addr()?);
    println!("Press Ctrl+C to stop");

    let mut tick = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = tick.tick() => server.tick().await,
            _ = &mut ctrl_c => break,
        }
    }

    manager.stop();
    server.stop();
    Ok(())
}
