//! Inbound packet decoding
//!
//! The observer only understands one packet: the clientbound "Collect Item"
//! packet sent when an entity picks up an item entity. Frames handed in are
//! already de-framed and decompressed: a VarInt packet id followed by the
//! payload.

use std::time::Instant;

use num_enum::TryFromPrimitive;

use super::constants::MAX_VARINT_BYTES;
use super::error::PacketDecodeError;

/// Clientbound play packet ids the observer decodes
///
/// Use `ClientboundPacket::try_from(id)` on a raw id; anything unknown is
/// passed through without being looked at.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum ClientboundPacket {
    CollectItem = 0x0D,
}

impl ClientboundPacket {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// An item entity was collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupEvent {
    /// Entity id of the item that was picked up
    pub collected_entity_id: i32,
    /// Entity id of whoever picked it up
    pub collector_entity_id: i32,
    pub observed_at: Instant,
}

impl PickupEvent {
    pub fn new(collected_entity_id: i32, collector_entity_id: i32) -> Self {
        Self {
            collected_entity_id,
            collector_entity_id,
            observed_at: Instant::now(),
        }
    }
}

/// Read a VarInt from the front of `buf`, returning the value and the number
/// of bytes consumed.
///
/// # Examples
///
/// ```
/// use room_secrets::core::packet::read_varint;
///
/// assert_eq!(read_varint(&[0x0D]), Ok((13, 1)));
/// assert_eq!(read_varint(&[0xAC, 0x02]), Ok((300, 2)));
/// ```
pub fn read_varint(buf: &[u8]) -> Result<(i32, usize), PacketDecodeError> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_BYTES {
        let byte = *buf.get(i).ok_or(PacketDecodeError::Truncated("varint"))?;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    Err(PacketDecodeError::VarIntTooLong)
}

/// Decode one inbound frame.
///
/// Returns `Ok(None)` for every packet other than Collect Item. Only the
/// packet id is read from those frames.
pub fn decode_inbound(frame: &[u8]) -> Result<Option<PickupEvent>, PacketDecodeError> {
    let (packet_id, mut offset) = read_varint(frame)?;
    if !matches!(
        ClientboundPacket::try_from(packet_id),
        Ok(ClientboundPacket::CollectItem)
    ) {
        return Ok(None);
    }

    let (collected, used) = read_varint(&frame[offset..])
        .map_err(|e| truncated_as(e, "collected entity id"))?;
    offset += used;
    let (collector, _) = read_varint(&frame[offset..])
        .map_err(|e| truncated_as(e, "collector entity id"))?;

    Ok(Some(PickupEvent::new(collected, collector)))
}

fn truncated_as(err: PacketDecodeError, field: &'static str) -> PacketDecodeError {
    match err {
        PacketDecodeError::Truncated(_) => PacketDecodeError::Truncated(field),
        other => other,
    }
}
