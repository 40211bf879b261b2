//! Simplified, deterministic orbital mechanics used by the COA planner
//! (spec §4.8). Every function here is pure and takes primitive inputs so
//! it is directly `#[test]`-able without mocks; ports of this module must
//! reproduce these constants and piecewise thresholds exactly (spec §9).

use std::f64::consts::PI;

/// Standard gravitational parameter of Earth, km³/s².
pub const MU_KM3_S2: f64 = 398_600.4418;
/// Mean Earth radius used by the planner's simplified formulas (spec §4.8;
/// the WGS84 value 6378.137 is used instead only where the spec calls it
/// out specifically, which is not the case here).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const STANDARD_GRAVITY_M_S2: f64 = 9.80665;
const SPECIFIC_IMPULSE_S: f64 = 300.0;
/// Default dry mass for fuel estimation when a satellite carries none
/// (mirrors `stellarops_types::satellite::DEFAULT_MASS_KG`).
pub const DEFAULT_MASS_KG: f64 = 500.0;
/// Constant-thrust acceleration assumption for burn-duration estimation.
const THRUST_ACCEL_M_S2: f64 = 0.1;
/// Fixed altitude step considered for a Hohmann single-burn estimate.
const HOHMANN_ALTITUDE_STEP_KM: f64 = 10.0;
/// Fixed inclination change considered for a plane-change estimate.
const PLANE_CHANGE_DELTA_I_DEG: f64 = 0.1;

/// Vis-viva: v = sqrt(mu * (2/r - 1/a)), km/s.
pub fn vis_viva_speed_km_s(r_km: f64, a_km: f64) -> f64 {
    (MU_KM3_S2 * (2.0 / r_km - 1.0 / a_km)).sqrt()
}

/// Circular-orbit speed at radius `r_km` (vis-viva specialized to a = r).
pub fn circular_speed_km_s(r_km: f64) -> f64 {
    vis_viva_speed_km_s(r_km, r_km)
}

/// Orbital period of a circular orbit of radius `r_km`, seconds.
pub fn orbital_period_seconds(r_km: f64) -> f64 {
    2.0 * PI * (r_km.powi(3) / MU_KM3_S2).sqrt()
}

/// Single-burn Δv (km/s) for a ±10 km altitude change between circular
/// orbits: Δv = |v(r) − v(r±10)|.
pub fn hohmann_altitude_delta_v_km_s(r_km: f64, raise: bool) -> f64 {
    let target_r = if raise {
        r_km + HOHMANN_ALTITUDE_STEP_KM
    } else {
        r_km - HOHMANN_ALTITUDE_STEP_KM
    };
    (circular_speed_km_s(r_km) - circular_speed_km_s(target_r)).abs()
}

/// Plane-change Δv (km/s) = 2·v·sin(Δi/2), Δi = 0.1°.
pub fn plane_change_delta_v_km_s(v_km_s: f64) -> f64 {
    2.0 * v_km_s * (PLANE_CHANGE_DELTA_I_DEG.to_radians() / 2.0).sin()
}

/// Tsiolkovsky fuel consumption: m_f = m0·(1 − e^(−Δv/(g0·Isp))).
pub fn fuel_used_kg(delta_v_m_s: f64, mass_kg: f64) -> f64 {
    mass_kg * (1.0 - (-delta_v_m_s / (STANDARD_GRAVITY_M_S2 * SPECIFIC_IMPULSE_S)).exp())
}

/// Burn duration under the constant 0.1 m/s² thrust assumption: Δv·1000 /
/// 0.1 seconds, where Δv is in km/s.
pub fn burn_duration_seconds(delta_v_km_s: f64) -> f64 {
    delta_v_km_s * 1000.0 / THRUST_ACCEL_M_S2
}

pub fn km_s_to_m_s(v_km_s: f64) -> f64 {
    v_km_s * 1000.0
}

/// Risk-scoring components (spec §4.8, 0 best / 100 worst).
pub fn fuel_risk(fuel_used_kg: f64) -> f64 {
    (fuel_used_kg / 50.0 * 100.0).min(100.0)
}

pub fn time_to_tca_risk(hours: f64) -> f64 {
    if hours < 1.0 {
        100.0
    } else if hours < 2.0 {
        75.0
    } else if hours < 4.0 {
        50.0
    } else if hours < 12.0 {
        25.0
    } else {
        10.0
    }
}

pub fn improvement_risk(improvement_km: f64) -> f64 {
    if improvement_km >= 20.0 {
        0.0
    } else if improvement_km >= 10.0 {
        20.0
    } else if improvement_km >= 5.0 {
        40.0
    } else if improvement_km >= 1.0 {
        60.0
    } else if improvement_km > 0.0 {
        80.0
    } else {
        100.0
    }
}

pub fn complexity_risk(coa_type: stellarops_types::CoaType) -> f64 {
    use stellarops_types::CoaType::*;
    match coa_type {
        StationKeeping => 0.0,
        ProgradeBurn | RetrogradeBurn => 20.0,
        Phasing => 50.0,
        InclinationChange => 80.0,
    }
}

/// Weighted risk score: fuel 30%, time-to-TCA 25%, improvement 30%,
/// complexity 15%.
pub fn risk_score(
    fuel_used_kg: f64,
    hours_to_tca: f64,
    improvement_km: f64,
    coa_type: stellarops_types::CoaType,
) -> f64 {
    0.30 * self::fuel_risk(fuel_used_kg)
        + 0.25 * time_to_tca_risk(hours_to_tca)
        + 0.30 * improvement_risk(improvement_km)
        + 0.15 * complexity_risk(coa_type)
}

/// Fixed predicted miss-distance improvement per COA type (spec §4.8).
pub fn predicted_improvement_km(coa_type: stellarops_types::CoaType) -> f64 {
    use stellarops_types::CoaType::*;
    match coa_type {
        RetrogradeBurn | ProgradeBurn => 5.0,
        Phasing => 8.0,
        InclinationChange => 20.0,
        StationKeeping => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_types::CoaType;

    const LEO_RADIUS_KM: f64 = EARTH_RADIUS_KM + 550.0;

    #[test]
    fn circular_speed_matches_known_leo_value() {
        let v = circular_speed_km_s(LEO_RADIUS_KM);
        assert!((v - 7.588_998_434_594_857).abs() < 1e-9);
    }

    #[test]
    fn hohmann_altitude_raise_delta_v_pins_worked_example() {
        let dv = hohmann_altitude_delta_v_km_s(LEO_RADIUS_KM, true);
        assert!((dv - 0.005_476_653_982_115_387).abs() < 1e-12);
    }

    #[test]
    fn plane_change_delta_v_pins_worked_example() {
        let v = circular_speed_km_s(LEO_RADIUS_KM);
        let dv = plane_change_delta_v_km_s(v);
        assert!((dv - 0.013_245_299_280_092_06).abs() < 1e-12);
    }

    #[test]
    fn fuel_used_pins_worked_example() {
        let dv = hohmann_altitude_delta_v_km_s(LEO_RADIUS_KM, true);
        let fuel = fuel_used_kg(km_s_to_m_s(dv), DEFAULT_MASS_KG);
        assert!((fuel - 0.929_906_343_614_561_6).abs() < 1e-9);
    }

    #[test]
    fn burn_duration_pins_worked_example() {
        let dv = hohmann_altitude_delta_v_km_s(LEO_RADIUS_KM, true);
        let duration = burn_duration_seconds(dv);
        assert!((duration - 54.766_539_821_153_87).abs() < 1e-6);
    }

    #[test]
    fn risk_piecewise_boundaries() {
        assert_eq!(time_to_tca_risk(0.5), 100.0);
        assert_eq!(time_to_tca_risk(1.0), 75.0);
        assert_eq!(time_to_tca_risk(2.0), 50.0);
        assert_eq!(time_to_tca_risk(4.0), 25.0);
        assert_eq!(time_to_tca_risk(12.0), 10.0);

        assert_eq!(improvement_risk(20.0), 0.0);
        assert_eq!(improvement_risk(10.0), 20.0);
        assert_eq!(improvement_risk(5.0), 40.0);
        assert_eq!(improvement_risk(1.0), 60.0);
        assert_eq!(improvement_risk(0.5), 80.0);
        assert_eq!(improvement_risk(0.0), 100.0);
    }

    #[test]
    fn complexity_risk_by_type() {
        assert_eq!(complexity_risk(CoaType::StationKeeping), 0.0);
        assert_eq!(complexity_risk(CoaType::ProgradeBurn), 20.0);
        assert_eq!(complexity_risk(CoaType::Phasing), 50.0);
        assert_eq!(complexity_risk(CoaType::InclinationChange), 80.0);
    }
}
