use crate::protocol::frame::{
    FireControlRequest, Frame, ImageTarget, RadarTarget, FRAME_HEADER, FRAME_PREFIX_LEN,
    IMAGE_RECORD_LEN, RADAR_RECORD_LEN,
};

/// Reason a byte buffer was not accepted as a frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("bad frame header {found:#06x}")]
    BadHeader { found: u16 },
    #[error("{section} record truncated at offset {offset}")]
    TruncatedRecord {
        section: &'static str,
        offset: usize,
    },
}

/// Encoder/decoder for the fixed-header, variable-body radar frame.
///
/// ```text
/// [u16 0xAA55][u8 stream][u8 length]
/// [u8 n] n × image record (58 bytes)
/// [u8 m] m × radar record (34 bytes)
/// [u8 k] k × u8 requested id
/// ```
/// Multi-byte fields are big-endian.
pub struct FrameCodec;

impl FrameCodec {
    pub fn encode(frame: &Frame) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(frame.encoded_len());
        buffer.extend_from_slice(&FRAME_HEADER.to_be_bytes());
        buffer.push(frame.stream_id);
        buffer.push(frame.length_field());

        // Counts are single bytes on the wire.
        let images = &frame.image_targets[..frame.image_targets.len().min(255)];
        buffer.push(images.len() as u8);
        for target in images {
            buffer.push(target.id);
            buffer.push(target.type_code);
            for value in [
                target.distance_m,
                target.azimuth_deg,
                target.frequency_hz,
                target.predicted_distance_m,
                target.predicted_azimuth_deg,
                target.speed_m_s,
                target.heading_deg,
            ] {
                buffer.extend_from_slice(&value.to_be_bytes());
            }
        }

        let radars = &frame.radar_targets[..frame.radar_targets.len().min(255)];
        buffer.push(radars.len() as u8);
        for target in radars {
            buffer.push(target.id);
            buffer.push(0);
            for value in [
                target.distance_m,
                target.azimuth_deg,
                target.rcs_db,
                target.velocity_m_s,
            ] {
                buffer.extend_from_slice(&value.to_be_bytes());
            }
        }

        let requests = &frame.requests[..frame.requests.len().min(255)];
        buffer.push(requests.len() as u8);
        buffer.extend(requests.iter().map(|request| request.target_id));

        buffer
    }

    pub fn decode(data: &[u8]) -> Option<Frame> {
        Self::try_decode(data).ok()
    }

    /// Decodes a frame. Sections missing from the end of the buffer, or that
    /// end on a record boundary before their declared count, are truncated
    /// silently; a record cut part-way is rejected.
    pub fn try_decode(data: &[u8]) -> Result<Frame, FrameError> {
        if data.len() < FRAME_PREFIX_LEN {
            return Err(FrameError::TooShort(data.len()));
        }

        let mut reader = ByteReader::new(data);
        let header = reader.u16();
        if header != FRAME_HEADER {
            return Err(FrameError::BadHeader { found: header });
        }
        let stream_id = reader.u8();
        let length = reader.u8();

        let mut image_targets = Vec::new();
        if let Some(count) = reader.section_count() {
            for _ in 0..count {
                if !reader.has_record("image", IMAGE_RECORD_LEN)? {
                    break;
                }
                image_targets.push(ImageTarget {
                    id: reader.u8(),
                    type_code: reader.u8(),
                    distance_m: reader.f64(),
                    azimuth_deg: reader.f64(),
                    frequency_hz: reader.f64(),
                    predicted_distance_m: reader.f64(),
                    predicted_azimuth_deg: reader.f64(),
                    speed_m_s: reader.f64(),
                    heading_deg: reader.f64(),
                });
            }
        }

        let mut radar_targets = Vec::new();
        if let Some(count) = reader.section_count() {
            for _ in 0..count {
                if !reader.has_record("radar", RADAR_RECORD_LEN)? {
                    break;
                }
                let id = reader.u8();
                let _reserved = reader.u8();
                radar_targets.push(RadarTarget {
                    id,
                    distance_m: reader.f64(),
                    azimuth_deg: reader.f64(),
                    rcs_db: reader.f64(),
                    velocity_m_s: reader.f64(),
                });
            }
        }

        let mut requests = Vec::new();
        if let Some(count) = reader.section_count() {
            for _ in 0..count {
                if reader.remaining() == 0 {
                    break;
                }
                requests.push(FireControlRequest::from(reader.u8()));
            }
        }

        Ok(Frame {
            header,
            stream_id,
            length,
            image_targets,
            radar_targets,
            requests,
        })
    }
}

pub fn hexdump(data: &[u8], max_len: usize) -> String {
    let shown = &data[..data.len().min(max_len)];
    let mut out = shown
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > shown.len() {
        out.push_str(&format!(" ... (+{} bytes)", data.len() - shown.len()));
    }
    out
}

struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn section_count(&mut self) -> Option<u8> {
        if self.remaining() == 0 {
            None
        } else {
            Some(self.u8())
        }
    }

    /// `Ok(false)` at a clean end of buffer, error when a record is cut.
    fn has_record(&self, section: &'static str, record_len: usize) -> Result<bool, FrameError> {
        match self.remaining() {
            0 => Ok(false),
            left if left < record_len => Err(FrameError::TruncatedRecord {
                section,
                offset: self.offset,
            }),
            _ => Ok(true),
        }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        bytes
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take::<2>())
    }

    fn f64(&mut self) -> f64 {
        f64::from_be_bytes(self.take::<8>())
    }
}
