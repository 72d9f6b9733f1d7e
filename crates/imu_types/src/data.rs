use bytes::{Buf, BufMut};

/// Samples batched into one packet.
pub const SAMPLES_PER_PACKET: usize = 3;

/// Wire size of one encoded [`Sample`]: u16 offset + 4 vectors of 3 × i16.
pub const SAMPLE_LEN: usize = 2 + 4 * 3 * 2;

/// Wire size of one encoded [`Packet`]: u32 sequence id + 3 samples.
pub const PACKET_LEN: usize = 4 + SAMPLES_PER_PACKET * SAMPLE_LEN;

/// One synchronized reading from both sensors.
///
/// The two sensors are read back-to-back within the same tick and treated as
/// simultaneous; the microsecond skew between them is accepted, not
/// corrected. Vectors are raw sensor units in X, Y, Z order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Milliseconds since the current session began. Wraps at ~65.5 s;
    /// sessions are expected to be shorter than the wrap period.
    pub time_offset: u16,
    pub accel_a: [i16; 3],
    pub gyro_a: [i16; 3],
    pub accel_b: [i16; 3],
    pub gyro_b: [i16; 3],
}

/// The unit of transmission: a full batch of samples plus a sequence id the
/// receiver uses to detect drops.
///
/// A packet is only ever built from exactly [`SAMPLES_PER_PACKET`] samples;
/// partial batches are discarded at session stop, never flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Packet {
    /// Monotonically increasing per session, starting at 0.
    pub sequence_id: u32,
    pub samples: [Sample; SAMPLES_PER_PACKET],
}

/// Error returned when a byte buffer cannot be decoded as a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame too short: got {got} bytes, need {PACKET_LEN}")]
    TooShort { got: usize },
}

/// Encode a packet into its fixed wire layout.
///
/// All fields are little-endian, laid out in declaration order with no
/// padding:
///
/// ```text
/// offset 0..4            sequence_id   u32
/// for n in 0..3, base = 4 + n*26:
///   base+0  .. base+2    time_offset   u16
///   base+2  .. base+8    accel_a       3 x i16 (X, Y, Z)
///   base+8  .. base+14   gyro_a        3 x i16
///   base+14 .. base+20   accel_b       3 x i16
///   base+20 .. base+26   gyro_b        3 x i16
/// ```
pub fn encode_packet(packet: &Packet) -> [u8; PACKET_LEN] {
    let mut frame = [0u8; PACKET_LEN];
    let mut dst = &mut frame[..];
    dst.put_u32_le(packet.sequence_id);
    for sample in &packet.samples {
        dst.put_u16_le(sample.time_offset);
        for vector in [
            &sample.accel_a,
            &sample.gyro_a,
            &sample.accel_b,
            &sample.gyro_b,
        ] {
            for &axis in vector {
                dst.put_i16_le(axis);
            }
        }
    }
    frame
}

/// Decode a frame produced by [`encode_packet`].
///
/// The daemon itself never decodes; this is the receiving side of the wire
/// contract, kept next to the encoder so the layout has a single source of
/// truth.
pub fn decode_packet(frame: &[u8]) -> Result<Packet, DecodeError> {
    if frame.len() < PACKET_LEN {
        return Err(DecodeError::TooShort { got: frame.len() });
    }

    let mut src = frame;
    let mut packet = Packet {
        sequence_id: src.get_u32_le(),
        ..Packet::default()
    };
    for sample in &mut packet.samples {
        sample.time_offset = src.get_u16_le();
        for vector in [
            &mut sample.accel_a,
            &mut sample.gyro_a,
            &mut sample.accel_b,
            &mut sample.gyro_b,
        ] {
            for axis in vector.iter_mut() {
                *axis = src.get_i16_le();
            }
        }
    }
    Ok(packet)
}
