use serde::{Deserialize, Serialize};

pub const FRAME_HEADER: u16 = 0xAA55;
pub const FRAME_PREFIX_LEN: usize = 4;
pub const IMAGE_RECORD_LEN: usize = 2 + 7 * 8;
pub const RADAR_RECORD_LEN: usize = 2 + 4 * 8;
/// Look-ahead used for the predicted position carried by image targets.
pub const PREDICTION_HORIZON_S: f64 = 0.03;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Unknown,
    Air,
    Surface,
    Missile,
}

impl TargetType {
    pub fn code(self) -> u8 {
        match self {
            TargetType::Unknown => 0,
            TargetType::Air => 1,
            TargetType::Surface => 2,
            TargetType::Missile => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => TargetType::Air,
            2 => TargetType::Surface,
            3 => TargetType::Missile,
            _ => TargetType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTarget {
    pub id: u8,
    /// Raw type code; see [`TargetType::from_code`].
    pub type_code: u8,
    pub distance_m: f64,
    pub azimuth_deg: f64,
    pub frequency_hz: f64,
    pub predicted_distance_m: f64,
    pub predicted_azimuth_deg: f64,
    pub speed_m_s: f64,
    pub heading_deg: f64,
}

impl ImageTarget {
    pub fn target_type(&self) -> TargetType {
        TargetType::from_code(self.type_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarTarget {
    pub id: u8,
    pub distance_m: f64,
    pub azimuth_deg: f64,
    pub rcs_db: f64,
    pub velocity_m_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireControlRequest {
    pub target_id: u8,
}

impl From<u8> for FireControlRequest {
    fn from(target_id: u8) -> Self {
        Self { target_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub header: u16,
    pub stream_id: u8,
    /// Byte count after the length byte, saturated at 255. Frames with many
    /// targets carry a length that no longer matches the body.
    pub length: u8,
    pub image_targets: Vec<ImageTarget>,
    pub radar_targets: Vec<RadarTarget>,
    pub requests: Vec<FireControlRequest>,
}

impl Frame {
    pub fn new(
        stream_id: u8,
        image_targets: Vec<ImageTarget>,
        radar_targets: Vec<RadarTarget>,
        requests: Vec<FireControlRequest>,
    ) -> Self {
        let mut frame = Self {
            header: FRAME_HEADER,
            stream_id,
            length: 0,
            image_targets,
            radar_targets,
            requests,
        };
        frame.length = frame.length_field();
        frame
    }

    pub fn body_len(&self) -> usize {
        1 + self.image_targets.len() * IMAGE_RECORD_LEN
            + 1
            + self.radar_targets.len() * RADAR_RECORD_LEN
            + 1
            + self.requests.len()
    }

    pub fn length_field(&self) -> u8 {
        self.body_len().min(u8::MAX as usize) as u8
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_PREFIX_LEN + self.body_len()
    }

    pub fn requested_ids(&self) -> Vec<u8> {
        self.requests.iter().map(|request| request.target_id).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "stream {} len {} | image {} | radar {} | requests {:?}",
            self.stream_id,
            self.length,
            self.image_targets.len(),
            self.radar_targets.len(),
            self.requested_ids()
        )
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, Vec::new(), Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_length_counts_three_count_bytes() {
        let frame = Frame::default();
        assert_eq!(frame.length, 3);
        assert_eq!(frame.encoded_len(), 7);
    }

    #[test]
    fn length_field_saturates_for_large_frames() {
        let radar = RadarTarget {
            id: 1,
            distance_m: 1000.0,
            azimuth_deg: 10.0,
            rcs_db: 0.0,
            velocity_m_s: 0.0,
        };
        let frame = Frame::new(0, Vec::new(), vec![radar; 10], Vec::new());
        assert_eq!(frame.body_len(), 3 + 10 * RADAR_RECORD_LEN);
        assert_eq!(frame.length, 255);
    }

    #[test]
    fn unknown_type_codes_map_to_unknown() {
        assert_eq!(TargetType::from_code(3), TargetType::Missile);
        assert_eq!(TargetType::from_code(42), TargetType::Unknown);
        assert_eq!(TargetType::Surface.code(), 2);
    }
}
