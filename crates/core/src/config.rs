//! Immutable game-physics configuration.
//!
//! Built once from the handshake line (see `strategy-bin`'s wire adapter)
//! and passed by shared reference everywhere else. Never mutated.

/// Physics and sizing constants for one match.
///
/// Fields map 1:1 onto the handshake keys in spec §6.1. Anything the engine
/// does not send over the wire falls back to the reference defaults used by
/// the original `agarcup` game engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub game_width: f32,
    pub game_height: f32,
    pub viscosity: f32,
    pub ticks_til_fusion: u32,
    pub virus_radius: f32,
    pub speed_factor: f32,
    pub inertion_factor: f32,
    pub food_mass: f32,
    pub food_radius: f32,
    pub ejection_mass: f32,
    pub ejection_radius: f32,

    pub mass_eat_factor: f32,
    pub diam_eat_factor: f32,
    pub vis_factor: f32,
    pub vis_shift: f32,
    pub min_burst_mass: f32,
    pub min_split_mass: f32,
    pub radius_factor: f32,
    pub min_shrink_mass: f32,
    pub shrink_factor: f32,
    pub shrink_every_tick: u32,
    pub rad_hurt_factor: f32,
    pub split_start_speed: f32,
}

/// Errors returned while building a [`Config`] from the handshake.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required handshake key: {0}")]
    MissingKey(&'static str),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_width: 660.0,
            game_height: 660.0,
            viscosity: 0.9,
            ticks_til_fusion: 250,
            virus_radius: 22.0,
            speed_factor: 1.0,
            inertion_factor: 10.0,
            food_mass: 1.0,
            food_radius: 2.5,
            ejection_mass: 15.0,
            ejection_radius: 4.0,

            mass_eat_factor: 1.2,
            diam_eat_factor: 1.0 / 3.0,
            vis_factor: 4.0,
            vis_shift: 120.0,
            min_burst_mass: 100.0,
            min_split_mass: 120.0,
            radius_factor: 2.0,
            min_shrink_mass: 100.0,
            shrink_factor: 0.01,
            shrink_every_tick: 50,
            rad_hurt_factor: 2.0 / 3.0,
            split_start_speed: 5.0,
        }
    }
}

impl Config {
    /// Build a config from a flat map of handshake keys to numeric values.
    ///
    /// `GAME_WIDTH` and `GAME_HEIGHT` are required per spec §3/§7; every
    /// other key falls back to [`Config::default`] when absent.
    pub fn from_handshake(get: impl Fn(&str) -> Option<f64>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let required = |key: &'static str| -> Result<f32, ConfigError> {
            get(key).map(|v| v as f32).ok_or(ConfigError::MissingKey(key))
        };
        let optional = |key: &str, default: f32| -> f32 {
            get(key).map(|v| v as f32).unwrap_or(default)
        };
        let optional_u32 = |key: &str, default: u32| -> u32 {
            get(key).map(|v| v as u32).unwrap_or(default)
        };

        Ok(Self {
            game_width: required("GAME_WIDTH")?,
            game_height: required("GAME_HEIGHT")?,
            viscosity: optional("VISCOSITY", defaults.viscosity),
            ticks_til_fusion: optional_u32("TICKS_TIL_FUSION", defaults.ticks_til_fusion),
            virus_radius: optional("VIRUS_RADIUS", defaults.virus_radius),
            speed_factor: optional("SPEED_FACTOR", defaults.speed_factor),
            inertion_factor: optional("INERTION_FACTOR", defaults.inertion_factor),
            food_mass: optional("FOOD_MASS", defaults.food_mass),
            food_radius: optional("FOOD_RADIUS", defaults.food_radius),
            ejection_mass: optional("EJECTION_MASS", defaults.ejection_mass),
            ejection_radius: optional("EJECTION_RADIUS", defaults.ejection_radius),

            mass_eat_factor: optional("MASS_EAT_FACTOR", defaults.mass_eat_factor),
            diam_eat_factor: optional("DIAM_EAT_FACTOR", defaults.diam_eat_factor),
            vis_factor: optional("VIS_FACTOR", defaults.vis_factor),
            vis_shift: optional("VIS_SHIFT", defaults.vis_shift),
            min_burst_mass: optional("MIN_BURST_MASS", defaults.min_burst_mass),
            min_split_mass: optional("MIN_SPLIT_MASS", defaults.min_split_mass),
            radius_factor: optional("RADIUS_FACTOR", defaults.radius_factor),
            min_shrink_mass: optional("MIN_SHRINK_MASS", defaults.min_shrink_mass),
            shrink_factor: optional("SHRINK_FACTOR", defaults.shrink_factor),
            shrink_every_tick: optional_u32("SHRINK_EVERY_TICK", defaults.shrink_every_tick),
            rad_hurt_factor: optional("RAD_HURT_FACTOR", defaults.rad_hurt_factor),
            split_start_speed: optional("SPLIT_START_SPEED", defaults.split_start_speed),
        })
    }

    /// `r = RADIUS_FACTOR * sqrt(m)`.
    #[inline]
    pub fn radius_for_mass(&self, m: f32) -> f32 {
        self.radius_factor * m.max(0.0).sqrt()
    }

    /// `SPEED_FACTOR / sqrt(m)`.
    #[inline]
    pub fn max_speed(&self, m: f32) -> f32 {
        self.speed_factor / m.max(1e-6).sqrt()
    }
}

/// Planner tuning constants. These never arrive over the wire (spec §3.1 of
/// SPEC_FULL); they are fixed per the search design in spec §4.6.
pub mod tuning {
    /// Squared distance beyond which the observed primary triggers a root reset.
    pub const ROOT_EPS: f32 = 1.0;
    /// Distance used to derive the per-edge skip count (§4.6.3).
    pub const SKIP_DISTANCE: f32 = 40.0;
    /// Forward-simulation expansions run per tick (§4.6.4).
    pub const EXPANSIONS_PER_TICK: usize = 20;
    /// Minimum depth (in skips) before a discovery node becomes expandable (§4.6.5).
    pub const MIN_EXPANSION_DEPTH: usize = 2;
    /// Number of equally spaced discovery directions seeded on commit (§4.6.5).
    pub const DISCOVERY_ANGLES: usize = 12;
    /// Fraction of a cell's radius used as the wall-safety margin (§4.5).
    pub const SAFETY_MARGIN_FACTOR: f32 = 1.0;
    /// Penalty applied per axis the cell is within its safety margin of a wall (§4.5).
    pub const SAFETY_MARGIN_PENALTY: f32 = -5.0;
    /// Weight applied to cell speed in the scoring function (§4.5).
    pub const SPEED_REWARD_FACTOR: f32 = 0.1;
    /// Expected per-tick wall-clock budget; overruns are logged, not aborted (§5).
    pub const AVG_TICK_TIME_SECS: f32 = 0.020;
    /// Interval (in ticks) at which the root-reset wander re-picks its target.
    pub const FALLBACK_SKIP: u32 = 100;
    /// Fixed relative angles probed at every expansion (§4.6.4).
    pub const EXPAND_ANGLES: [f32; 4] = [
        0.0,
        std::f32::consts::FRAC_PI_2,
        -std::f32::consts::FRAC_PI_2,
        std::f32::consts::PI,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_key_errors() {
        let err = Config::from_handshake(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("GAME_WIDTH"));
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let cfg = Config::from_handshake(|k| match k {
            "GAME_WIDTH" => Some(660.0),
            "GAME_HEIGHT" => Some(660.0),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.game_width, 660.0);
        assert_eq!(cfg.food_mass, Config::default().food_mass);
    }

    #[test]
    fn radius_and_speed_formulas() {
        let cfg = Config::default();
        assert!((cfg.radius_for_mass(25.0) - cfg.radius_factor * 5.0).abs() < 1e-4);
        assert!((cfg.max_speed(25.0) - cfg.speed_factor / 5.0).abs() < 1e-4);
    }
}
