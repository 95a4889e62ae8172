// Datagram layout shared with the external controller. Samples go out as a
// 4-byte little-endian millisecond timestamp followed by a 4-byte
// little-endian float. Setpoint commands come in as a single little-endian
// float. No header, no length prefix, no acknowledgement.

pub const SAMPLE_LEN: usize = 8;
pub const COMMAND_LEN: usize = 4;

pub fn encode_sample(timestamp_ms: u32, value: f32) -> [u8; SAMPLE_LEN] {
    let mut buf = [0u8; SAMPLE_LEN];
    buf[..4].copy_from_slice(&timestamp_ms.to_le_bytes());
    buf[4..].copy_from_slice(&value.to_le_bytes());
    buf
}

// Anything but exactly 8 bytes is not a sample.
pub fn decode_sample(data: &[u8]) -> Option<(u32, f32)> {
    if data.len() != SAMPLE_LEN {
        return None;
    }
    let timestamp_ms = u32::from_le_bytes(data[..4].try_into().ok()?);
    let value = f32::from_le_bytes(data[4..].try_into().ok()?);
    Some((timestamp_ms, value))
}

// Anything but exactly 4 bytes is not a command.
pub fn decode_setpoint(data: &[u8]) -> Option<f32> {
    let bytes: [u8; COMMAND_LEN] = data.try_into().ok()?;
    Some(f32::from_le_bytes(bytes))
}
