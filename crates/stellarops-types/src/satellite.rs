//! Satellite entity and its energy-driven mode hysteresis (spec §3).

use crate::ids::SatelliteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SatelliteMode {
    Nominal,
    Safe,
    Survival,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x_km: f64,
    pub y_km: f64,
    pub z_km: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x_km: 0.0,
        y_km: 0.0,
        z_km: 0.0,
    };

    pub fn distance_km(&self, other: &Position) -> f64 {
        let dx = self.x_km - other.x_km;
        let dy = self.y_km - other.y_km;
        let dz = self.z_km - other.z_km;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TleSet {
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatelliteId,
    pub mode: SatelliteMode,
    pub energy: f64,
    pub memory_used: f64,
    pub position: Position,
    pub tle: Option<TleSet>,
    pub mass_kg: f64,
    pub created_at: DateTime<Utc>,
    pub checkpointed_at: Option<DateTime<Utc>>,
}

/// Default dry mass used throughout §4.8's fuel calculations when a
/// satellite doesn't carry an explicit mass.
pub const DEFAULT_MASS_KG: f64 = 500.0;

impl Satellite {
    pub fn new(id: SatelliteId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            mode: SatelliteMode::Nominal,
            energy: 100.0,
            memory_used: 0.0,
            position: Position::ORIGIN,
            tle: None,
            mass_kg: DEFAULT_MASS_KG,
            created_at: now,
            checkpointed_at: None,
        }
    }

    /// Clamp `energy` into `[0, 100]` and re-derive `mode` from the
    /// hysteretic table in spec §3:
    ///
    /// - energy < 5           -> survival
    /// - survival, energy >= 10 -> safe
    /// - energy < 20 (and not already survival) -> safe
    /// - safe, energy >= 30    -> nominal
    ///
    /// The hysteresis means recovery out of a degraded mode requires a
    /// higher threshold than the one that triggered it.
    pub fn apply_energy_delta(&mut self, delta: f64) {
        self.energy = (self.energy + delta).clamp(0.0, 100.0);
        self.mode = derive_mode(self.mode, self.energy);
    }

    pub fn set_memory_used(&mut self, absolute: f64) {
        self.memory_used = absolute.clamp(0.0, 100.0);
    }

    /// Explicit operator override: bypasses derivation for this call only.
    /// The next energy update still re-derives from the table.
    pub fn set_mode_override(&mut self, mode: SatelliteMode) {
        self.mode = mode;
    }

    pub fn update_position(&mut self, position: Position) {
        self.position = position;
    }
}

fn derive_mode(current: SatelliteMode, energy: f64) -> SatelliteMode {
    match current {
        SatelliteMode::Survival => {
            if energy >= 10.0 {
                if energy >= 30.0 {
                    SatelliteMode::Nominal
                } else {
                    SatelliteMode::Safe
                }
            } else {
                SatelliteMode::Survival
            }
        }
        SatelliteMode::Safe => {
            if energy < 5.0 {
                SatelliteMode::Survival
            } else if energy >= 30.0 {
                SatelliteMode::Nominal
            } else {
                SatelliteMode::Safe
            }
        }
        SatelliteMode::Nominal => {
            if energy < 5.0 {
                SatelliteMode::Survival
            } else if energy < 20.0 {
                SatelliteMode::Safe
            } else {
                SatelliteMode::Nominal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat() -> Satellite {
        Satellite::new(SatelliteId::new("SAT-1"), Utc::now())
    }

    #[test]
    fn energy_clamps_to_valid_range() {
        let mut s = sat();
        s.apply_energy_delta(1000.0);
        assert_eq!(s.energy, 100.0);
        s.apply_energy_delta(-1000.0);
        assert_eq!(s.energy, 0.0);
    }

    #[test]
    fn boundary_survival_entry_and_hysteretic_recovery() {
        let mut s = sat();
        s.energy = 100.0;
        s.mode = SatelliteMode::Nominal;
        s.apply_energy_delta(-95.1); // -> 4.9
        assert_eq!(s.mode, SatelliteMode::Survival);

        s.apply_energy_delta(5.0); // -> 9.9, still survival
        assert!((s.energy - 9.9).abs() < 1e-9);
        assert_eq!(s.mode, SatelliteMode::Survival);

        s.apply_energy_delta(0.1); // -> 10.0, survival -> safe
        assert!((s.energy - 10.0).abs() < 1e-9);
        assert_eq!(s.mode, SatelliteMode::Safe);
    }

    #[test]
    fn boundary_safe_to_nominal() {
        let mut s = sat();
        s.energy = 29.9;
        s.mode = SatelliteMode::Safe;
        s.apply_energy_delta(0.0);
        assert_eq!(s.mode, SatelliteMode::Safe);

        s.apply_energy_delta(0.1); // -> 30.0
        assert_eq!(s.mode, SatelliteMode::Nominal);
    }

    #[test]
    fn set_mode_override_does_not_stick() {
        let mut s = sat();
        s.energy = 100.0;
        s.set_mode_override(SatelliteMode::Safe);
        assert_eq!(s.mode, SatelliteMode::Safe);
        // Next energy update re-derives from the table.
        s.apply_energy_delta(0.0);
        assert_eq!(s.mode, SatelliteMode::Nominal);
    }

    proptest::proptest! {
        #[test]
        fn energy_stays_in_bounds_for_any_sequence_of_deltas(deltas in proptest::collection::vec(-200.0f64..200.0, 0..50)) {
            let mut s = sat();
            for delta in deltas {
                s.apply_energy_delta(delta);
                proptest::prop_assert!(s.energy >= 0.0 && s.energy <= 100.0);
            }
        }

        #[test]
        fn memory_used_stays_in_bounds_for_any_absolute_value(value in -500.0f64..500.0) {
            let mut s = sat();
            s.set_memory_used(value);
            proptest::prop_assert!(s.memory_used >= 0.0 && s.memory_used <= 100.0);
        }
    }
}
