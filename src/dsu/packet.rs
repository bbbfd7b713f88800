//! DSU wire framing
//!
//! Every packet starts with a 16-byte header: magic, protocol version (LE),
//! payload length (LE), CRC32 of the whole packet with the CRC field zeroed,
//! and the sender's session id. This module owns header assembly, inbound
//! validation and the fixed-layout PadDataRsp report serialization.

use thiserror::Error;

use crate::dsu::constants::{
    CLIENT_MAGIC, HEADER_LEN, MAX_PROTOCOL_VERSION, PAD_DATA_RSP_LEN, SERVER_MAGIC,
};
use crate::dsu::types::DualShockPadMeta;
use crate::inputs::{AxisFlag, ButtonFlag, ControllerState, Vec3};

// ============================================================================
// Message codes (u32 LE after the header; same code both directions)
// ============================================================================

/// Version handshake request/response
pub const MSG_VERSION: u32 = 0x0010_0000;

/// Port listing request / per-slot info response
pub const MSG_PORT_INFO: u32 = 0x0010_0001;

/// Pad-data subscription request / periodic report
pub const MSG_PAD_DATA: u32 = 0x0010_0002;

/// Why an inbound datagram was dropped. Dropped silently on the wire; the
/// server logs these at trace level only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("datagram shorter than header + message code")]
    Truncated,

    #[error("bad magic")]
    BadMagic,

    #[error("protocol version {0} above maximum {MAX_PROTOCOL_VERSION}")]
    UnsupportedVersion(u16),

    #[error("declared payload length {declared} does not match buffer {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("crc mismatch")]
    CrcMismatch,
}

/// Validated view of a client datagram.
#[derive(Debug, PartialEq, Eq)]
pub struct Incoming<'a> {
    pub protocol_version: u16,
    pub client_id: u32,
    pub message_type: u32,
    /// Message body after the client id and message code
    pub payload: &'a [u8],
}

/// CRC32 over the packet with the CRC field treated as zero, computed
/// without copying or mutating the buffer.
fn packet_crc(buf: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&buf[..8]);
    hasher.update(&[0u8; 4]);
    hasher.update(&buf[12..]);
    hasher.finalize()
}

/// Write the server header into `buf` and return the payload offset.
/// The CRC field is left zeroed for `finish_packet`.
pub fn begin_packet(buf: &mut [u8], server_id: u32) -> usize {
    buf[0..4].copy_from_slice(&SERVER_MAGIC);
    buf[4..6].copy_from_slice(&MAX_PROTOCOL_VERSION.to_le_bytes());
    let payload_len = (buf.len() - HEADER_LEN) as u16;
    buf[6..8].copy_from_slice(&payload_len.to_le_bytes());
    buf[8..12].fill(0);
    buf[12..16].copy_from_slice(&server_id.to_le_bytes());
    HEADER_LEN
}

/// Seal a fully written packet by stamping its CRC.
pub fn finish_packet(buf: &mut [u8]) {
    buf[8..12].fill(0);
    let crc = packet_crc(buf);
    buf[8..12].copy_from_slice(&crc.to_le_bytes());
}

/// Validate a client datagram: magic, version ceiling, declared length
/// against the actual buffer, then CRC.
pub fn parse_client_packet(buf: &[u8]) -> Result<Incoming<'_>, PacketError> {
    if buf.len() < HEADER_LEN + 8 {
        return Err(PacketError::Truncated);
    }
    if buf[0..4] != CLIENT_MAGIC {
        return Err(PacketError::BadMagic);
    }

    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version > MAX_PROTOCOL_VERSION {
        return Err(PacketError::UnsupportedVersion(version));
    }

    let declared = u16::from_le_bytes([buf[6], buf[7]]) as usize;
    let actual = buf.len() - HEADER_LEN;
    if declared != actual {
        return Err(PacketError::LengthMismatch { declared, actual });
    }

    let crc_field = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    if crc_field != packet_crc(buf) {
        return Err(PacketError::CrcMismatch);
    }

    let client_id = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
    let message_type = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);

    Ok(Incoming {
        protocol_version: version,
        client_id,
        message_type,
        payload: &buf[HEADER_LEN + 8..],
    })
}

// ============================================================================
// Response payloads
// ============================================================================

/// VersionRsp body: message code, max version, two pad bytes.
pub fn version_rsp_payload() -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0..4].copy_from_slice(&MSG_VERSION.to_le_bytes());
    out[4..6].copy_from_slice(&MAX_PROTOCOL_VERSION.to_le_bytes());
    out
}

/// PortInfo body for one slot: message code, slot identity, address, battery.
pub fn port_info_payload(meta: &DualShockPadMeta) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&MSG_PORT_INFO.to_le_bytes());
    out[4] = meta.pad_id;
    out[5] = meta.pad_state as u8;
    out[6] = meta.model as u8;
    out[7] = meta.connection_type as u8;
    out[8..14].copy_from_slice(meta.pad_mac_address.bytes());
    out[14] = meta.battery_status as u8;
    out[15] = 0;
    out
}

/// Map a full-range stick axis onto one wire byte (0–255).
fn normalize_stick(value: i16) -> u8 {
    ((value as i32 + 32_768) / 257) as u8
}

/// Build one complete PadDataRsp packet, CRC included.
///
/// The controller report layout is fixed by the protocol: packed-bit bytes
/// first, then the same buttons again as expanded 0xFF/0x00 bytes, then
/// analog values, touch points and motion. Stick Y and gyro Y/Z are inverted
/// to match the consumer's coordinate system.
pub fn write_pad_data_rsp(
    server_id: u32,
    counter: u32,
    meta: &DualShockPadMeta,
    inputs: &ControllerState,
    accel: Vec3,
    gyro: Vec3,
) -> [u8; PAD_DATA_RSP_LEN] {
    let buttons = &inputs.buttons;
    let axes = &inputs.axes;

    let mut buf = [0u8; PAD_DATA_RSP_LEN];
    let mut idx = begin_packet(&mut buf, server_id);

    buf[idx..idx + 4].copy_from_slice(&MSG_PAD_DATA.to_le_bytes());
    idx += 4;

    buf[idx] = meta.pad_id;
    buf[idx + 1] = meta.pad_state as u8;
    buf[idx + 2] = meta.model as u8;
    buf[idx + 3] = meta.connection_type as u8;
    idx += 4;
    buf[idx..idx + 6].copy_from_slice(meta.pad_mac_address.bytes());
    idx += 6;
    buf[idx] = meta.battery_status as u8;
    buf[idx + 1] = meta.is_active as u8;
    idx += 2;

    buf[idx..idx + 4].copy_from_slice(&counter.to_le_bytes());
    idx += 4;

    // packed d-pad and meta buttons
    let mut packed = 0u8;
    if buttons.get(ButtonFlag::DPadLeft) {
        packed |= 0x80;
    }
    if buttons.get(ButtonFlag::DPadDown) {
        packed |= 0x40;
    }
    if buttons.get(ButtonFlag::DPadRight) {
        packed |= 0x20;
    }
    if buttons.get(ButtonFlag::DPadUp) {
        packed |= 0x10;
    }
    if buttons.get(ButtonFlag::Start) {
        packed |= 0x08;
    }
    if buttons.get(ButtonFlag::RightStickClick) {
        packed |= 0x04;
    }
    if buttons.get(ButtonFlag::LeftStickClick) {
        packed |= 0x02;
    }
    if buttons.get(ButtonFlag::Back) {
        packed |= 0x01;
    }
    buf[idx] = packed;
    idx += 1;

    // packed face/shoulder buttons, triggers digital at full pull
    let mut packed = 0u8;
    if buttons.get(ButtonFlag::B3) {
        packed |= 0x80;
    }
    if buttons.get(ButtonFlag::B1) {
        packed |= 0x40;
    }
    if buttons.get(ButtonFlag::B2) {
        packed |= 0x20;
    }
    if buttons.get(ButtonFlag::B4) {
        packed |= 0x10;
    }
    if buttons.get(ButtonFlag::R1) {
        packed |= 0x08;
    }
    if buttons.get(ButtonFlag::L1) {
        packed |= 0x04;
    }
    if axes.get(AxisFlag::R2) == u8::MAX as i16 {
        packed |= 0x02;
    }
    if axes.get(AxisFlag::L2) == u8::MAX as i16 {
        packed |= 0x01;
    }
    buf[idx] = packed;
    idx += 1;

    buf[idx] = buttons.get(ButtonFlag::Special) as u8;
    buf[idx + 1] =
        (buttons.get(ButtonFlag::LeftPadClick) || buttons.get(ButtonFlag::RightPadClick)) as u8;
    idx += 2;

    // sticks, one byte each, Y inverted by convention
    buf[idx] = normalize_stick(axes.get(AxisFlag::LeftStickX));
    buf[idx + 1] = u8::MAX - normalize_stick(axes.get(AxisFlag::LeftStickY));
    buf[idx + 2] = normalize_stick(axes.get(AxisFlag::RightStickX));
    buf[idx + 3] = u8::MAX - normalize_stick(axes.get(AxisFlag::RightStickY));
    idx += 4;

    // the protocol carries both packed bits and expanded bytes
    let expanded = [
        ButtonFlag::DPadLeft,
        ButtonFlag::DPadDown,
        ButtonFlag::DPadRight,
        ButtonFlag::DPadUp,
        ButtonFlag::B1,
        ButtonFlag::B2,
        ButtonFlag::B3,
        ButtonFlag::B4,
        ButtonFlag::R1,
        ButtonFlag::L1,
    ];
    for flag in expanded {
        buf[idx] = if buttons.get(flag) { 0xFF } else { 0x00 };
        idx += 1;
    }

    buf[idx] = axes.get(AxisFlag::R2) as u8;
    buf[idx + 1] = axes.get(AxisFlag::L2) as u8;
    idx += 2;

    for point in &inputs.touch {
        buf[idx] = point.active as u8;
        buf[idx + 1] = point.tracking_id;
        buf[idx + 2..idx + 4].copy_from_slice(&point.x.to_le_bytes());
        buf[idx + 4..idx + 6].copy_from_slice(&point.y.to_le_bytes());
        idx += 6;
    }

    buf[idx..idx + 8].copy_from_slice(&inputs.motion_timestamp.to_le_bytes());
    idx += 8;

    buf[idx..idx + 4].copy_from_slice(&accel.x.to_le_bytes());
    buf[idx + 4..idx + 8].copy_from_slice(&accel.y.to_le_bytes());
    buf[idx + 8..idx + 12].copy_from_slice(&accel.z.to_le_bytes());
    idx += 12;

    // gyro Y/Z negated to match the consumer's coordinate system
    buf[idx..idx + 4].copy_from_slice(&gyro.x.to_le_bytes());
    buf[idx + 4..idx + 8].copy_from_slice(&(-gyro.y).to_le_bytes());
    buf[idx + 8..idx + 12].copy_from_slice(&(-gyro.z).to_le_bytes());
    idx += 12;

    debug_assert_eq!(idx, PAD_DATA_RSP_LEN);
    finish_packet(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsu::constants::NUM_SLOTS;

    /// Client-side packet builder, mirroring what a DSU consumer sends.
    fn client_packet(message_type: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + 8 + body.len()];
        buf[0..4].copy_from_slice(&CLIENT_MAGIC);
        buf[4..6].copy_from_slice(&MAX_PROTOCOL_VERSION.to_le_bytes());
        let payload_len = (buf.len() - HEADER_LEN) as u16;
        buf[6..8].copy_from_slice(&payload_len.to_le_bytes());
        buf[12..16].copy_from_slice(&0xABCD_1234u32.to_le_bytes());
        buf[20..24].copy_from_slice(&message_type.to_le_bytes());
        buf[24..].copy_from_slice(body);
        finish_packet_as_client(&mut buf);
        buf
    }

    fn finish_packet_as_client(buf: &mut [u8]) {
        buf[8..12].fill(0);
        let crc = packet_crc(buf);
        buf[8..12].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn valid_packet_parses() {
        let buf = client_packet(MSG_VERSION, &[]);
        let incoming = parse_client_packet(&buf).unwrap();
        assert_eq!(incoming.message_type, MSG_VERSION);
        assert_eq!(incoming.client_id, 0xABCD_1234);
        assert_eq!(incoming.protocol_version, MAX_PROTOCOL_VERSION);
        assert!(incoming.payload.is_empty());
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buf = client_packet(MSG_VERSION, &[]);
        buf[0..4].copy_from_slice(b"DSUS");
        finish_packet_as_client(&mut buf);
        assert_eq!(parse_client_packet(&buf), Err(PacketError::BadMagic));
    }

    #[test]
    fn rejects_future_version() {
        let mut buf = client_packet(MSG_VERSION, &[]);
        buf[4..6].copy_from_slice(&1002u16.to_le_bytes());
        finish_packet_as_client(&mut buf);
        assert_eq!(
            parse_client_packet(&buf),
            Err(PacketError::UnsupportedVersion(1002))
        );
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut buf = client_packet(MSG_VERSION, &[]);
        buf[6..8].copy_from_slice(&99u16.to_le_bytes());
        finish_packet_as_client(&mut buf);
        assert!(matches!(
            parse_client_packet(&buf),
            Err(PacketError::LengthMismatch { declared: 99, .. })
        ));
    }

    #[test]
    fn any_single_byte_flip_fails_crc() {
        let good = client_packet(MSG_PAD_DATA, &[0x00, 0x01, 0x10, 0x10, 0x10, 0x10, 0x10, 0x10]);
        assert!(parse_client_packet(&good).is_ok());

        for i in 12..good.len() {
            let mut bad = good.clone();
            bad[i] ^= 0x01;
            assert_eq!(
                parse_client_packet(&bad),
                Err(PacketError::CrcMismatch),
                "flip at byte {i} should fail crc"
            );
        }
    }

    #[test]
    fn rejects_short_datagram() {
        assert_eq!(
            parse_client_packet(&[0u8; HEADER_LEN]),
            Err(PacketError::Truncated)
        );
    }

    #[test]
    fn server_header_roundtrip() {
        let mut buf = [0u8; 24];
        let idx = begin_packet(&mut buf, 0xDEAD_BEEF);
        assert_eq!(idx, HEADER_LEN);
        finish_packet(&mut buf);

        assert_eq!(&buf[0..4], b"DSUS");
        assert_eq!(u16::from_le_bytes([buf[4], buf[5]]), MAX_PROTOCOL_VERSION);
        assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 8);
        assert_eq!(
            u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            0xDEAD_BEEF
        );
        let crc = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        assert_eq!(crc, packet_crc(&buf));
    }

    #[test]
    fn normalize_stick_bounds() {
        assert_eq!(normalize_stick(i16::MIN), 0);
        assert_eq!(normalize_stick(0), 127);
        assert_eq!(normalize_stick(i16::MAX), 255);
    }

    #[test]
    fn port_info_payload_layout() {
        let meta = DualShockPadMeta::for_slot(2);
        let payload = port_info_payload(&meta);
        assert_eq!(&payload[0..4], &MSG_PORT_INFO.to_le_bytes());
        assert_eq!(payload[4], 2);
        assert_eq!(payload[5], 0x02); // connected
        assert_eq!(payload[6], 2); // ds4
        assert_eq!(payload[7], 0x01); // usb
        assert_eq!(&payload[8..14], &[0x12; 6]);
        assert_eq!(payload[14], 0x05); // full
        assert!(meta.pad_id < NUM_SLOTS as u8);
    }
}
