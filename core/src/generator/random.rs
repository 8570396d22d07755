//! Independent per-tick draws, plus the type/kinematics distributions shared
//! with the motion roster.

use crate::generator::GeneratorConfig;
use crate::math::AngleHelper;
use crate::protocol::{
    FireControlRequest, ImageTarget, RadarMode, RadarTarget, TargetType, PREDICTION_HORIZON_S,
};
use rand::Rng;

const ID_RANGE: std::ops::RangeInclusive<u8> = 100..=250;

pub(crate) fn draw_target_type<R: Rng>(rng: &mut R, config: &GeneratorConfig) -> TargetType {
    let roll: f64 = rng.gen();
    if roll < config.missile_probability {
        TargetType::Missile
    } else if roll < config.missile_probability + config.surface_probability {
        TargetType::Surface
    } else {
        TargetType::Air
    }
}

pub(crate) fn draw_speed<R: Rng>(rng: &mut R, target_type: TargetType) -> f64 {
    match target_type {
        TargetType::Missile => rng.gen_range(200.0..400.0),
        TargetType::Surface => rng.gen_range(0.0..50.0),
        TargetType::Air | TargetType::Unknown => rng.gen_range(50.0..300.0),
    }
}

/// Missiles tend to radiate high-band seekers, ground targets nothing.
pub(crate) fn draw_emission<R: Rng>(rng: &mut R, target_type: TargetType) -> f64 {
    match target_type {
        TargetType::Missile => {
            if rng.gen_bool(0.5) {
                2.4e9
            } else {
                5.8e9
            }
        }
        TargetType::Air => match rng.gen_range(0..3) {
            0 => 0.0,
            1 => 1.2e9,
            _ => 2.4e9,
        },
        TargetType::Surface | TargetType::Unknown => 0.0,
    }
}

/// Sea-search modes see larger returns, air combat smaller ones.
pub(crate) fn mode_rcs_bias<R: Rng>(rng: &mut R, mode: RadarMode) -> f64 {
    if mode.is_sea_search() {
        rng.gen_range(-5.0..15.0)
    } else if mode.is_air_combat() {
        -rng.gen_range(0.0..10.0)
    } else {
        0.0
    }
}

pub fn image_targets<R: Rng>(rng: &mut R, config: &GeneratorConfig) -> Vec<ImageTarget> {
    let (min_distance, max_distance) = config.distance_bounds();
    let count = rng.gen_range(0..=config.max_image_targets);
    (0..count)
        .map(|_| {
            let id = rng.gen_range(ID_RANGE);
            let target_type = draw_target_type(rng, config);
            let speed = draw_speed(rng, target_type);
            let distance = rng.gen_range(min_distance..max_distance);
            let azimuth = rng.gen_range(0.0..360.0);
            let heading = rng.gen_range(0.0..360.0);
            ImageTarget {
                id,
                type_code: target_type.code(),
                distance_m: distance,
                azimuth_deg: azimuth,
                frequency_hz: draw_emission(rng, target_type),
                predicted_distance_m: (distance - speed * PREDICTION_HORIZON_S).max(0.0),
                predicted_azimuth_deg: AngleHelper::wrap_degrees(
                    azimuth + (speed / 1000.0) * PREDICTION_HORIZON_S * 360.0,
                ),
                speed_m_s: speed,
                heading_deg: heading,
            }
        })
        .collect()
}

pub fn radar_targets<R: Rng>(
    rng: &mut R,
    config: &GeneratorConfig,
    mode: RadarMode,
) -> Vec<RadarTarget> {
    let (min_distance, max_distance) = config.distance_bounds();
    let count = rng.gen_range(0..=config.max_radar_targets);
    (0..count)
        .map(|_| {
            let id = rng.gen_range(ID_RANGE);
            let distance = rng.gen_range(min_distance..max_distance);
            let azimuth = rng.gen_range(0.0..360.0);
            let velocity = rng.gen_range(-200.0..400.0);
            let base_rcs = rng.gen_range(-20.0..20.0);
            RadarTarget {
                id,
                distance_m: distance,
                azimuth_deg: azimuth,
                rcs_db: base_rcs + mode_rcs_bias(rng, mode),
                velocity_m_s: velocity,
            }
        })
        .collect()
}

pub fn requests<R: Rng>(rng: &mut R, config: &GeneratorConfig) -> Vec<FireControlRequest> {
    let count = rng.gen_range(0..=config.max_requests);
    (0..count)
        .map(|_| FireControlRequest::from(rng.gen_range(ID_RANGE)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn image_targets_respect_bounds() {
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let targets = image_targets(&mut rng, &config);
            assert!(targets.len() <= config.max_image_targets);
            for target in targets {
                assert!(ID_RANGE.contains(&target.id));
                assert!(target.distance_m >= 500.0 && target.distance_m < 50_000.0);
                assert!(target.predicted_distance_m <= target.distance_m);
                assert!((0.0..360.0).contains(&target.predicted_azimuth_deg));
                if target.target_type() == TargetType::Surface {
                    assert_eq!(target.frequency_hz, 0.0);
                    assert!(target.speed_m_s < 50.0);
                }
                if target.target_type() == TargetType::Missile {
                    assert!(target.frequency_hz >= 2.4e9);
                    assert!(target.speed_m_s >= 200.0);
                }
            }
        }
    }

    #[test]
    fn sea_search_raises_and_air_combat_lowers_rcs_on_average() {
        let config = GeneratorConfig {
            max_radar_targets: 20,
            ..Default::default()
        };
        let mean_rcs = |mode: RadarMode| {
            let mut rng = StdRng::seed_from_u64(11);
            let samples: Vec<f64> = (0..200)
                .flat_map(|_| radar_targets(&mut rng, &config, mode))
                .map(|target| target.rcs_db)
                .collect();
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        let neutral = mean_rcs(RadarMode::RangeSearch);
        assert!(mean_rcs(RadarMode::SeaSearch1) > neutral + 2.0);
        assert!(mean_rcs(RadarMode::AirCombat) < neutral - 2.0);
    }

    #[test]
    fn request_count_is_bounded() {
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert!(requests(&mut rng, &config).len() <= 3);
        }
    }
}
