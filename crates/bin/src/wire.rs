//! The boundary adapter: line-delimited JSON in, line-delimited JSON out
//! (spec §6.1). Nothing here touches the planner's own types beyond
//! building a [`strategy_core::Snapshot`] and reading back a [`Decision`];
//! all physics/search semantics live in `strategy-core`.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use strategy_core::{Command, Config, Enemy, OwnCell, Pellet, Snapshot, Virus};
use thiserror::Error;

/// Errors that can occur while parsing wire input (spec §7).
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("malformed JSON: {0}")]
    Json(String),
    #[error("unknown object type: {0:?}")]
    UnknownObjectType(String),
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Json(e.to_string())
    }
}

/// The handshake line: a flat map of config keys to numeric values (spec §6.1).
pub fn parse_handshake(line: &str) -> Result<Config, ConfigLoadError> {
    let raw: HashMap<String, f64> = serde_json::from_str(line).map_err(|e| ConfigLoadError::Wire(WireError::from(e)))?;
    Config::from_handshake(|key| raw.get(key).copied()).map_err(ConfigLoadError::Config)
}

/// Wraps either a wire-format failure or a missing-key config failure behind
/// one type so `main` has a single fail-fast error path (spec §7).
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Config(#[from] strategy_core::config::ConfigError),
}

#[derive(Debug, Deserialize)]
struct WireOwnCell {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "X")]
    x: f32,
    #[serde(rename = "Y")]
    y: f32,
    #[serde(rename = "R")]
    r: f32,
    #[serde(rename = "M")]
    m: f32,
    #[serde(rename = "SX")]
    sx: f32,
    #[serde(rename = "SY")]
    sy: f32,
    #[serde(rename = "TTF")]
    ttf: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct WireObject {
    #[serde(rename = "T")]
    t: String,
    #[serde(rename = "X")]
    x: f32,
    #[serde(rename = "Y")]
    y: f32,
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "M")]
    m: Option<f32>,
    #[serde(rename = "R")]
    r: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct WireTick {
    #[serde(rename = "Mine", default)]
    mine: Vec<WireOwnCell>,
    #[serde(rename = "Objects", default)]
    objects: Vec<WireObject>,
}

/// Parse one per-tick input line into a [`Snapshot`] (spec §6.1, §4.3).
///
/// `tick` is this crate's own running counter — the wire schema carries no
/// tick index, so [`Snapshot::tick`] is maintained by the caller.
pub fn parse_tick(line: &str, tick: u64, cfg: &Config) -> Result<Snapshot, WireError> {
    let wire: WireTick = serde_json::from_str(line)?;

    let mut snap = Snapshot::new(tick);
    for cell in wire.mine {
        let v = Vec2::new(cell.sx, cell.sy);
        let mut own = OwnCell {
            id: cell.id,
            pos: Vec2::new(cell.x, cell.y),
            r: cell.r,
            m: cell.m,
            v,
            // The wire schema has no explicit fast flag; a cell is "fast"
            // exactly when its reported speed exceeds its mass-derived cap
            // (spec GLOSSARY, "Fast").
            is_fast: v.length() > cfg.max_speed(cell.m) + 1e-3,
            ttf: cell.ttf.map(|t| t.max(0.0) as u32).unwrap_or(0),
        };
        own.r = if own.r > 0.0 { own.r } else { cfg.radius_for_mass(own.m) };
        snap.own.push(own);
    }

    for obj in wire.objects {
        let pos = Vec2::new(obj.x, obj.y);
        match obj.t.as_str() {
            "F" => snap.food.push(Pellet::food(pos, cfg)),
            "E" => snap.food.push(Pellet::ejection(pos, cfg)),
            "V" => {
                let id = obj.id.unwrap_or_default();
                let m = obj.m.unwrap_or(cfg.virus_radius.powi(2));
                snap.viruses.push(Virus::new(id, pos, m, cfg));
            }
            "P" => {
                let id = obj.id.unwrap_or_default();
                let m = obj.m.unwrap_or(0.0);
                let r = obj.r.unwrap_or_else(|| cfg.radius_for_mass(m));
                snap.enemies.push(Enemy { id, pos, r, m });
            }
            other => return Err(WireError::UnknownObjectType(other.to_string())),
        }
    }

    snap.sort_own();
    Ok(snap)
}

/// The per-tick output envelope (spec §6.1). `pause`/`draw` are only ever
/// populated in debug mode, and debug drawing itself stays a pass-through
/// `None` — rendering the arena is out of scope (spec §1) but the *fields*
/// must still round-trip so an engine running in debug mode doesn't choke on
/// missing keys.
#[derive(Debug, Serialize)]
pub struct WireOutput {
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "Split")]
    pub split: bool,
    #[serde(rename = "Debug")]
    pub debug: String,
    #[serde(rename = "Pause", skip_serializing_if = "Option::is_none")]
    pub pause: Option<bool>,
    #[serde(rename = "Draw", skip_serializing_if = "Option::is_none")]
    pub draw: Option<DrawEnvelope>,
}

#[derive(Debug, Serialize)]
pub struct DrawEnvelope {
    #[serde(rename = "Lines")]
    pub lines: Vec<serde_json::Value>,
    #[serde(rename = "Circles")]
    pub circles: Vec<serde_json::Value>,
}

impl WireOutput {
    pub fn from_command(command: Command, debug: String, debug_mode: bool) -> Self {
        Self {
            x: command.target.x,
            y: command.target.y,
            split: command.split,
            debug,
            pause: debug_mode.then_some(false),
            draw: debug_mode.then(|| DrawEnvelope {
                lines: Vec::new(),
                circles: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn handshake_requires_width_and_height() {
        let err = parse_handshake("{}").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Config(_)));
    }

    #[test]
    fn handshake_parses_known_keys() {
        let cfg = parse_handshake(r#"{"GAME_WIDTH":660,"GAME_HEIGHT":660,"FOOD_MASS":2.0}"#).unwrap();
        assert_eq!(cfg.game_width, 660.0);
        assert_eq!(cfg.food_mass, 2.0);
    }

    #[test]
    fn tick_parses_mine_and_objects() {
        let cfg = cfg();
        let line = r#"{"Mine":[{"Id":"a","X":10,"Y":20,"R":5,"M":25,"SX":0,"SY":0}],
            "Objects":[{"T":"F","X":1,"Y":2},{"T":"V","Id":"v1","X":3,"Y":4,"M":40},
                       {"T":"P","Id":"e1","X":5,"Y":6,"M":50,"R":12}]}"#;
        let snap = parse_tick(line, 0, &cfg).unwrap();
        assert_eq!(snap.own.len(), 1);
        assert_eq!(snap.own[0].id, "a");
        assert_eq!(snap.food.len(), 1);
        assert_eq!(snap.viruses.len(), 1);
        assert_eq!(snap.enemies.len(), 1);
    }

    #[test]
    fn unknown_object_type_is_an_error() {
        let cfg = cfg();
        let line = r#"{"Mine":[],"Objects":[{"T":"Z","X":0,"Y":0}]}"#;
        let err = parse_tick(line, 0, &cfg).unwrap_err();
        assert_eq!(err, WireError::UnknownObjectType("Z".to_string()));
    }

    #[test]
    fn fast_flag_is_derived_from_speed_over_cap() {
        let cfg = cfg();
        let fast_speed = cfg.max_speed(25.0) + 1.0;
        let line = format!(
            r#"{{"Mine":[{{"Id":"a","X":10,"Y":20,"R":5,"M":25,"SX":{fast_speed},"SY":0,"TTF":30}}],"Objects":[]}}"#
        );
        let snap = parse_tick(&line, 0, &cfg).unwrap();
        assert!(snap.own[0].is_fast);
        assert_eq!(snap.own[0].ttf, 30);
    }

    #[test]
    fn output_omits_pause_and_draw_outside_debug_mode() {
        let cfg = cfg();
        let out = WireOutput::from_command(Command::new(Vec2::new(1.0, 2.0), true, &cfg), "ok".into(), false);
        let json = serde_json::to_string(&out).unwrap();
        assert!(!json.contains("Pause"));
        assert!(!json.contains("Draw"));
        assert!(json.contains("\"Split\":true"));
    }

    #[test]
    fn output_includes_pause_and_draw_in_debug_mode() {
        let cfg = cfg();
        let out = WireOutput::from_command(Command::new(Vec2::new(1.0, 2.0), false, &cfg), "ok".into(), true);
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("Pause"));
        assert!(json.contains("Draw"));
    }
}
