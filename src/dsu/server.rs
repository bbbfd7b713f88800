//! DSU protocol server
//!
//! One UDP socket, an explicit server context (no globals): subscribing
//! clients tracked per scope with a 5 second freshness window, canonical
//! state pushed in by the producer side, reports broadcast from an external
//! tick. The receive loop is a single long-lived task; sends run through a
//! bounded pool of pre-allocated buffers so a crowd of clients cannot balloon
//! memory or in-flight socket work.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use log::{debug, error, info, trace, warn};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::dsu::constants::{
    BATTERY_REFRESH, CLIENT_TIMEOUT, HEADER_LEN, NUM_SLOTS, RECV_BUFFER_LEN, SEND_BUFFER_LEN,
    SEND_POOL_LEN,
};
use crate::dsu::packet::{
    begin_packet, finish_packet, parse_client_packet, port_info_payload, version_rsp_payload,
    write_pad_data_rsp, MSG_PAD_DATA, MSG_PORT_INFO, MSG_VERSION,
};
use crate::dsu::types::{ClientRequestTimes, DualShockPadMeta, MacAddress};
use crate::inputs::{ControllerState, MotionSource, Vec3};
use crate::power::PowerSource;

/// Number of external motion-fusion inputs (feeding pad slots 1 and 2).
pub const FUSION_SLOTS: usize = 2;

#[derive(Debug, Error)]
pub enum DsuServerError {
    #[error("Couldn't listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// One fused accelerometer/gyroscope estimate pushed by an external
/// motion-fusion stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionFrame {
    pub accelerometer: Vec3,
    pub gyroscope: Vec3,
}

struct ServerCtx {
    socket: UdpSocket,
    server_id: u32,
    /// Written from the receive path, swept from the tick path
    clients: Mutex<HashMap<SocketAddr, ClientRequestTimes>>,
    pad_metas: Mutex<[DualShockPadMeta; NUM_SLOTS]>,
    inputs: RwLock<ControllerState>,
    fusion: RwLock<[Option<MotionFrame>; FUSION_SLOTS]>,
    packet_counter: AtomicU32,
    /// Admission control for in-flight sends
    send_pool: Arc<Semaphore>,
    send_buffers: Vec<tokio::sync::Mutex<[u8; SEND_BUFFER_LEN]>>,
    /// Round-robin cursor over `send_buffers`; its own lock, never the
    /// registry's
    pool_index: Mutex<usize>,
    last_battery_refresh: Mutex<Option<Instant>>,
    power: Box<dyn PowerSource>,
    running: AtomicBool,
    shutdown: CancellationToken,
}

/// The DSU endpoint. Clones share one server context, so any handle can push
/// state or drive the tick; stop the server explicitly with [`DsuServer::stop`].
#[derive(Clone)]
pub struct DsuServer {
    ctx: Arc<ServerCtx>,
}

impl DsuServer {
    /// Bind the UDP socket and build the server context. A bind failure
    /// (port already taken) is fatal to the server only; the caller decides
    /// what to do with the rest of the process.
    pub async fn bind(
        config: &ServerConfig,
        power: Box<dyn PowerSource>,
    ) -> Result<Self, DsuServerError> {
        let addr = format!("{}:{}", config.bind_address, config.port);
        let socket = UdpSocket::bind(&addr).await.map_err(|source| {
            error!("DSU server couldn't listen on {addr}: {source}");
            DsuServerError::Bind {
                addr: addr.clone(),
                source,
            }
        })?;

        let mut pad_metas = [DualShockPadMeta::for_slot(0); NUM_SLOTS];
        for (slot, meta) in pad_metas.iter_mut().enumerate() {
            *meta = DualShockPadMeta::for_slot(slot as u8);
        }

        let send_buffers = (0..SEND_POOL_LEN)
            .map(|_| tokio::sync::Mutex::new([0u8; SEND_BUFFER_LEN]))
            .collect();

        let ctx = Arc::new(ServerCtx {
            socket,
            server_id: session_id(),
            clients: Mutex::new(HashMap::new()),
            pad_metas: Mutex::new(pad_metas),
            inputs: RwLock::new(ControllerState::new()),
            fusion: RwLock::new([None; FUSION_SLOTS]),
            packet_counter: AtomicU32::new(0),
            send_pool: Arc::new(Semaphore::new(SEND_POOL_LEN)),
            send_buffers,
            pool_index: Mutex::new(0),
            last_battery_refresh: Mutex::new(None),
            power,
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        });

        Ok(Self { ctx })
    }

    /// Spawn the receive loop and mark the server running. One lifecycle per
    /// binding: a stopped server stays stopped (rebind for a fresh one).
    pub fn start(&self) {
        if self.ctx.shutdown.is_cancelled() {
            warn!("DSU server was stopped and cannot be restarted");
            return;
        }
        if self.ctx.running.swap(true, Ordering::SeqCst) {
            warn!("DSU server already running");
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let token = self.ctx.shutdown.clone();
        tokio::spawn(async move {
            Self::recv_loop(ctx, token).await;
        });

        match self.local_addr() {
            Ok(addr) => info!("DSU server started, listening on {addr}"),
            Err(_) => info!("DSU server started"),
        }
    }

    /// Stop broadcasting and wind down the receive loop.
    pub fn stop(&self) {
        if self.ctx.running.swap(false, Ordering::SeqCst) {
            self.ctx.shutdown.cancel();
            info!("DSU server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ctx.running.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.ctx.socket.local_addr()
    }

    /// Number of endpoints currently in the registry.
    pub fn client_count(&self) -> usize {
        self.ctx.clients.lock().unwrap().len()
    }

    /// Push entry point for the producer side: replace the canonical state
    /// the next tick will serialize.
    pub fn update_inputs(&self, state: ControllerState) {
        *self.ctx.inputs.write().unwrap() = state;
    }

    /// Push one external motion-fusion estimate. Index 0 feeds pad slot 1,
    /// index 1 feeds pad slot 2.
    pub fn update_motion(&self, index: usize, frame: MotionFrame) {
        let mut fusion = self.ctx.fusion.write().unwrap();
        if let Some(slot) = fusion.get_mut(index) {
            *slot = Some(frame);
        }
    }

    /// Recent copy of the canonical state (what the next tick would report).
    pub fn snapshot_inputs(&self) -> ControllerState {
        self.ctx.inputs.read().unwrap().clone()
    }

    // ========================================================================
    // Receive path
    // ========================================================================

    async fn recv_loop(ctx: Arc<ServerCtx>, token: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                result = ctx.socket.recv_from(&mut buf) => match result {
                    Ok((len, peer)) => {
                        // copy the datagram out so the socket is re-armed by
                        // the next loop turn before we touch the contents
                        let datagram = buf[..len].to_vec();
                        Self::process_incoming(&ctx, &datagram, peer).await;
                    }
                    Err(e) => {
                        // a vanished peer can surface as a connection reset;
                        // never let that take the server down
                        debug!("receive fault, re-arming: {e}");
                    }
                },
            }
        }
        debug!("DSU receive loop exited");
    }

    async fn process_incoming(ctx: &Arc<ServerCtx>, datagram: &[u8], peer: SocketAddr) {
        let incoming = match parse_client_packet(datagram) {
            Ok(incoming) => incoming,
            Err(e) => {
                trace!("dropping packet from {peer}: {e}");
                return;
            }
        };

        match incoming.message_type {
            MSG_VERSION => {
                Self::send_payload(ctx, peer, &version_rsp_payload()).await;
            }
            MSG_PORT_INFO => {
                let payload = incoming.payload;
                if payload.len() < 4 {
                    trace!("short port-info request from {peer}");
                    return;
                }
                let count =
                    i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
                let requests = &payload[4..];
                if count > NUM_SLOTS || requests.len() < count {
                    trace!("invalid port-info request from {peer}");
                    return;
                }
                if requests[..count].iter().any(|id| *id as usize >= NUM_SLOTS) {
                    trace!("port-info request with bad slot from {peer}");
                    return;
                }

                let metas = *ctx.pad_metas.lock().unwrap();
                for id in &requests[..count] {
                    let payload = port_info_payload(&metas[*id as usize]);
                    Self::send_payload(ctx, peer, &payload).await;
                }
            }
            MSG_PAD_DATA => {
                let payload = incoming.payload;
                if payload.len() < 8 {
                    trace!("short pad-data request from {peer}");
                    return;
                }
                let reg_flags = payload[0];
                let pad_id = payload[1];
                let mut mac = [0u8; 6];
                mac.copy_from_slice(&payload[2..8]);

                let now = Instant::now();
                let mut clients = ctx.clients.lock().unwrap();
                clients
                    .entry(peer)
                    .or_default()
                    .request_pad_info(reg_flags, pad_id, MacAddress(mac), now);
            }
            other => {
                trace!("unknown message type {other:#x} from {peer}");
            }
        }
    }

    // ========================================================================
    // Send path
    // ========================================================================

    /// Frame `payload` into a full packet and hand it to the bounded sender.
    async fn send_payload(ctx: &Arc<ServerCtx>, target: SocketAddr, payload: &[u8]) {
        let mut packet = vec![0u8; payload.len() + HEADER_LEN];
        let idx = begin_packet(&mut packet, ctx.server_id);
        packet[idx..].copy_from_slice(payload);
        finish_packet(&mut packet);
        Self::send_raw(ctx, target, packet).await;
    }

    /// Dispatch one finished packet: acquire a pool slot (waits briefly when
    /// all slots are in flight), pick a pre-allocated buffer round-robin,
    /// and send asynchronously. A failed send is logged and isolated.
    async fn send_raw(ctx: &Arc<ServerCtx>, target: SocketAddr, packet: Vec<u8>) {
        let permit = match Arc::clone(&ctx.send_pool).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let slot = {
            let mut index = ctx.pool_index.lock().unwrap();
            let current = *index;
            *index = (current + 1) % SEND_POOL_LEN;
            current
        };

        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let _permit = permit;
            let mut buf = ctx.send_buffers[slot].lock().await;
            let len = packet.len().min(SEND_BUFFER_LEN);
            buf[..len].copy_from_slice(&packet[..len]);
            if let Err(e) = ctx.socket.send_to(&buf[..len], target).await {
                debug!("send to {target} failed: {e}");
            }
        });
    }

    // ========================================================================
    // Tick path
    // ========================================================================

    /// Broadcast callback for the host's shared timer.
    pub async fn tick(&self) {
        self.tick_at(Instant::now()).await;
    }

    /// Broadcast using the supplied clock reading. Exposed so lifecycle
    /// behavior (timeouts, purging) can be driven deterministically.
    pub async fn tick_at(&self, now: Instant) {
        if !self.is_running() {
            return;
        }

        self.refresh_battery(now);

        let inputs = self.snapshot_inputs();
        let fusion = *self.ctx.fusion.read().unwrap();
        let metas = *self.ctx.pad_metas.lock().unwrap();

        for meta in metas.iter() {
            // live set for this slot, plus opportunistic purge of clients
            // whose every scope has gone stale
            let targets: Vec<SocketAddr> = {
                let mut clients = self.ctx.clients.lock().unwrap();
                let mut live = Vec::new();
                let mut dead = Vec::new();
                for (addr, times) in clients.iter() {
                    if times.is_live_for(meta.pad_id, &meta.pad_mac_address, now, CLIENT_TIMEOUT) {
                        live.push(*addr);
                    } else if times.is_expired(now, CLIENT_TIMEOUT) {
                        dead.push(*addr);
                    }
                }
                for addr in dead {
                    debug!("client {addr} timed out, dropping from registry");
                    clients.remove(&addr);
                }
                live
            };

            if targets.is_empty() {
                continue;
            }

            let (accel, gyro) = Self::motion_for_slot(meta.pad_id, &inputs, &fusion);
            let counter = self.ctx.packet_counter.fetch_add(1, Ordering::Relaxed);
            let packet = write_pad_data_rsp(self.ctx.server_id, counter, meta, &inputs, accel, gyro);

            for target in targets {
                Self::send_raw(&self.ctx, target, packet.to_vec()).await;
            }
        }
    }

    /// Motion source selection is a closed per-slot mapping: slot 0 carries
    /// the relay estimate from the canonical state, slots 1 and 2 carry the
    /// indexed external fusion frames, slot 3 always reports zero motion.
    fn motion_for_slot(
        slot: u8,
        inputs: &ControllerState,
        fusion: &[Option<MotionFrame>; FUSION_SLOTS],
    ) -> (Vec3, Vec3) {
        match slot {
            0 => (
                inputs.gyro.accelerometer(MotionSource::Relay),
                inputs.gyro.gyroscope(MotionSource::Relay),
            ),
            1 | 2 => match fusion[(slot - 1) as usize] {
                Some(frame) => (frame.accelerometer, frame.gyroscope),
                None => (Vec3::ZERO, Vec3::ZERO),
            },
            _ => (Vec3::ZERO, Vec3::ZERO),
        }
    }

    /// Refresh the battery tag from host power state, about once per second.
    fn refresh_battery(&self, now: Instant) {
        {
            let mut last = self.ctx.last_battery_refresh.lock().unwrap();
            match *last {
                Some(at) if now.saturating_duration_since(at) < BATTERY_REFRESH => return,
                _ => *last = Some(now),
            }
        }

        let battery = self.ctx.power.status().into();
        let mut metas = self.ctx.pad_metas.lock().unwrap();
        for meta in metas.iter_mut() {
            meta.battery_status = battery;
        }
    }
}

/// Random-enough session id: clients only use it to notice server restarts.
fn session_id() -> u32 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(0);
    hasher.finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::GyroState;
    use crate::power::{MockPower, PowerStatus};

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn bind_start_stop() {
        let server = DsuServer::bind(&test_config(), Box::new(MockPower::new(PowerStatus::High)))
            .await
            .unwrap();
        assert!(!server.is_running());

        server.start();
        assert!(server.is_running());
        assert_ne!(server.local_addr().unwrap().port(), 0);

        server.stop();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn double_bind_fails_only_the_second_server() {
        let first = DsuServer::bind(&test_config(), Box::new(MockPower::new(PowerStatus::High)))
            .await
            .unwrap();

        let taken = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: first.local_addr().unwrap().port(),
            ..ServerConfig::default()
        };
        let second =
            DsuServer::bind(&taken, Box::new(MockPower::new(PowerStatus::High))).await;
        assert!(matches!(second, Err(DsuServerError::Bind { .. })));
        // the first server is unaffected
        assert!(first.local_addr().is_ok());
    }

    #[tokio::test]
    async fn pushed_inputs_are_snapshotted() {
        let server = DsuServer::bind(&test_config(), Box::new(MockPower::new(PowerStatus::High)))
            .await
            .unwrap();

        let mut state = ControllerState::new();
        state.motion_timestamp = 42;
        let mut gyro = GyroState::new();
        gyro.update_all(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        state.gyro = gyro;

        server.update_inputs(state.clone());
        assert_eq!(server.snapshot_inputs(), state);
    }

    #[tokio::test]
    async fn fusion_index_out_of_range_is_a_no_op() {
        let server = DsuServer::bind(&test_config(), Box::new(MockPower::new(PowerStatus::High)))
            .await
            .unwrap();
        server.update_motion(FUSION_SLOTS, MotionFrame::default());
        assert_eq!(*server.ctx.fusion.read().unwrap(), [None; FUSION_SLOTS]);
    }

    #[test]
    fn session_ids_differ() {
        assert_ne!(session_id(), session_id());
    }

    #[test]
    fn motion_slot_mapping() {
        let mut inputs = ControllerState::new();
        inputs
            .gyro
            .set_accelerometer(MotionSource::Relay, Vec3::new(0.0, 1.0, 0.0));

        let fusion = [
            Some(MotionFrame {
                accelerometer: Vec3::new(9.0, 0.0, 0.0),
                gyroscope: Vec3::new(0.0, 9.0, 0.0),
            }),
            None,
        ];

        let (accel0, _) = DsuServer::motion_for_slot(0, &inputs, &fusion);
        assert_eq!(accel0, Vec3::new(0.0, 1.0, 0.0));

        let (accel1, gyro1) = DsuServer::motion_for_slot(1, &inputs, &fusion);
        assert_eq!(accel1, Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(gyro1, Vec3::new(0.0, 9.0, 0.0));

        let (accel2, gyro2) = DsuServer::motion_for_slot(2, &inputs, &fusion);
        assert_eq!((accel2, gyro2), (Vec3::ZERO, Vec3::ZERO));

        let (accel3, gyro3) = DsuServer::motion_for_slot(3, &inputs, &fusion);
        assert_eq!((accel3, gyro3), (Vec3::ZERO, Vec3::ZERO));
    }
}
