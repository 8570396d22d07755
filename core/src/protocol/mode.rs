use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode of the simulated fire-control radar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RadarMode {
    VelocitySearch,
    #[default]
    RangeSearch,
    TargetTrack,
    ScanTrack,
    AirCombat,
    MapMapping,
    FreezeFrame,
    BeamSharpening,
    Beacon,
    WeatherDetect,
    CollisionAvoid,
    Identify,
    AntiJam,
    #[serde(rename = "sea-search-1")]
    SeaSearch1,
    #[serde(rename = "sea-search-2")]
    SeaSearch2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeParams {
    pub scan_rate_deg_s: f64,
    pub frequency_hz: f64,
    pub description: &'static str,
}

const fn params(scan_rate_deg_s: f64, frequency_hz: f64, description: &'static str) -> ModeParams {
    ModeParams {
        scan_rate_deg_s,
        frequency_hz,
        description,
    }
}

static MODE_TABLE: [(RadarMode, &str, ModeParams); 15] = [
    (RadarMode::VelocitySearch, "velocity-search", params(120.0, 9.6e9, "velocity search")),
    (RadarMode::RangeSearch, "range-search", params(60.0, 9.4e9, "range-while-search")),
    (RadarMode::TargetTrack, "target-track", params(30.0, 9.5e9, "single target track")),
    (RadarMode::ScanTrack, "scan-track", params(45.0, 9.4e9, "track-while-scan")),
    (RadarMode::AirCombat, "air-combat", params(180.0, 9.7e9, "air combat manoeuvring")),
    (RadarMode::MapMapping, "map-mapping", params(15.0, 9.3e9, "ground mapping")),
    (RadarMode::FreezeFrame, "freeze-frame", params(0.0, 9.4e9, "frozen picture")),
    (RadarMode::BeamSharpening, "beam-sharpening", params(20.0, 9.8e9, "doppler beam sharpening")),
    (RadarMode::Beacon, "beacon", params(0.0, 1.0e9, "beacon")),
    (RadarMode::WeatherDetect, "weather-detect", params(25.0, 5.6e9, "weather detection")),
    (RadarMode::CollisionAvoid, "collision-avoid", params(90.0, 9.9e9, "collision avoidance")),
    (RadarMode::Identify, "identify", params(60.0, 9.4e9, "identification")),
    (RadarMode::AntiJam, "anti-jam", params(100.0, 10.0e9, "anti-jamming")),
    (RadarMode::SeaSearch1, "sea-search-1", params(40.0, 9.2e9, "air/sea search 1")),
    (RadarMode::SeaSearch2, "sea-search-2", params(35.0, 9.1e9, "air/sea search 2")),
];

impl RadarMode {
    pub const ALL: [RadarMode; 15] = [
        RadarMode::VelocitySearch,
        RadarMode::RangeSearch,
        RadarMode::TargetTrack,
        RadarMode::ScanTrack,
        RadarMode::AirCombat,
        RadarMode::MapMapping,
        RadarMode::FreezeFrame,
        RadarMode::BeamSharpening,
        RadarMode::Beacon,
        RadarMode::WeatherDetect,
        RadarMode::CollisionAvoid,
        RadarMode::Identify,
        RadarMode::AntiJam,
        RadarMode::SeaSearch1,
        RadarMode::SeaSearch2,
    ];

    fn entry(self) -> &'static (RadarMode, &'static str, ModeParams) {
        // Every variant has a row.
        MODE_TABLE
            .iter()
            .find(|(mode, _, _)| *mode == self)
            .unwrap_or(&MODE_TABLE[1])
    }

    pub fn params(self) -> ModeParams {
        self.entry().2
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn is_air_combat(self) -> bool {
        self == RadarMode::AirCombat
    }

    pub fn is_sea_search(self) -> bool {
        matches!(self, RadarMode::SeaSearch1 | RadarMode::SeaSearch2)
    }

    pub fn threat_factor(self) -> f64 {
        if self.is_air_combat() {
            1.5
        } else {
            1.0
        }
    }
}

impl fmt::Display for RadarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseModeError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for RadarMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        MODE_TABLE
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(mode, _, _)| *mode)
            .ok_or_else(|| ParseModeError {
                kind: "radar mode",
                value: s.to_string(),
            })
    }
}
