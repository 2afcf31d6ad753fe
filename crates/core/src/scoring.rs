//! Tip utility function (spec §4.5).

use crate::config::{tuning, Config};
use crate::entities::{self, OwnCell};
use crate::snapshot::Snapshot;

/// `score(node) = max(0, sum of blob_score(cell) over own cells)`, forced to
/// zero if any danger can still hurt an own cell (spec §4.5).
pub fn score(state: &Snapshot, cfg: &Config) -> f32 {
    if any_danger_threatens(state, cfg) {
        return 0.0;
    }
    let total: f32 = state.own.iter().map(|cell| blob_score(cell, cfg)).sum();
    total.max(0.0)
}

fn blob_score(cell: &OwnCell, cfg: &Config) -> f32 {
    cell.m + cell.v.length() * tuning::SPEED_REWARD_FACTOR + safety_penalty(cell, cfg)
}

/// Penalize proximity to a wall, per axis, by `SAFETY_MARGIN_PENALTY`.
fn safety_penalty(cell: &OwnCell, cfg: &Config) -> f32 {
    let margin = cell.r * tuning::SAFETY_MARGIN_FACTOR;
    let mut penalty = 0.0;
    if cell.pos.x < margin || cell.pos.x > cfg.game_width - margin {
        penalty += tuning::SAFETY_MARGIN_PENALTY;
    }
    if cell.pos.y < margin || cell.pos.y > cfg.game_height - margin {
        penalty += tuning::SAFETY_MARGIN_PENALTY;
    }
    penalty
}

/// True iff any enemy or virus not yet eaten can still hurt an own cell in this state.
fn any_danger_threatens(state: &Snapshot, cfg: &Config) -> bool {
    for enemy in &state.enemies {
        if state.eaten.contains(&enemy.id) {
            continue;
        }
        if state.own.iter().any(|cell| entities::can_eat(enemy, cell, cfg)) {
            return true;
        }
    }
    for virus in &state.viruses {
        if state.own.iter().any(|cell| virus.can_hurt(cell, cfg)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Enemy, OwnCell, Virus};
    use glam::Vec2;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn dead_state_scores_zero() {
        let cfg = cfg();
        let state = Snapshot::new(0);
        assert_eq!(score(&state, &cfg), 0.0);
    }

    #[test]
    fn healthy_state_scores_positive() {
        let cfg = cfg();
        let mut state = Snapshot::new(0);
        state.own.push(OwnCell::new(
            "a",
            Vec2::new(cfg.game_width / 2.0, cfg.game_height / 2.0),
            100.0,
            Vec2::ZERO,
            &cfg,
        ));
        assert!(score(&state, &cfg) > 0.0);
    }

    #[test]
    fn danger_forces_zero_score() {
        let cfg = cfg();
        let mut state = Snapshot::new(0);
        state.own.push(OwnCell::new("a", Vec2::ZERO, 10.0, Vec2::ZERO, &cfg));
        state.enemies.push(Enemy {
            id: "e".into(),
            pos: Vec2::new(1.0, 0.0),
            r: cfg.radius_for_mass(100.0),
            m: 100.0,
        });
        assert_eq!(score(&state, &cfg), 0.0);
    }

    #[test]
    fn eaten_danger_does_not_zero_score() {
        let cfg = cfg();
        let mut state = Snapshot::new(0);
        state.own.push(OwnCell::new("a", Vec2::ZERO, 10.0, Vec2::ZERO, &cfg));
        state.enemies.push(Enemy {
            id: "e".into(),
            pos: Vec2::new(1.0, 0.0),
            r: cfg.radius_for_mass(100.0),
            m: 100.0,
        });
        state.eaten.insert("e".to_string());
        assert!(score(&state, &cfg) > 0.0);
    }

    #[test]
    fn nearby_virus_zeros_score_for_bursting_cell() {
        let cfg = cfg();
        let mut state = Snapshot::new(0);
        state
            .own
            .push(OwnCell::new("a", Vec2::new(1.0, 0.0), cfg.min_burst_mass * 2.5, Vec2::ZERO, &cfg));
        state.viruses.push(Virus::new("v", Vec2::ZERO, 40.0, &cfg));
        assert_eq!(score(&state, &cfg), 0.0);
    }
}
