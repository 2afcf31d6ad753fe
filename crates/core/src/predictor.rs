//! The pure, one-tick physics predictor (spec §4.4).
//!
//! `predict` never touches the network, the clock, or any mutable global
//! state: given a [`Snapshot`] and a [`Command`] it is fully determined by
//! [`Config`]. This is what makes it safe to call thousands of times per
//! tick while building the search tree (spec §4.6.4).

use glam::Vec2;
use std::collections::HashSet;

use crate::config::Config;
use crate::entities::{self, Command, EntityId, OwnCell, PelletKind};
use crate::geometry;
use crate::snapshot::Snapshot;

/// Advance `state` by exactly one tick under `command` (spec §4.4, steps 1-11).
pub fn predict(state: &Snapshot, command: &Command, cfg: &Config) -> Snapshot {
    let mut next = state.clone();
    next.tick = state.tick + 1;

    if next.own.is_empty() {
        // Dead: nothing left to simulate (spec §4.6.8, §8 "predictor totality").
        return next;
    }

    apply_intent(&mut next.own, command, cfg);
    shrink(&mut next.own, next.tick, cfg);
    eat_pellets(&mut next, cfg);
    eat_enemies(&mut next, cfg);
    virus_collisions(&mut next, cfg);
    refresh_radius_and_speed(&mut next.own, cfg);
    if command.split {
        split(&mut next.own, cfg);
    }
    mov(&mut next.own, cfg);
    apply_viscosity(&mut next.own, cfg);
    tick_fusion(&mut next.own);
    next.sort_own();
    next
}

/// Step 1: steer every non-fast cell toward `command.target`.
fn apply_intent(own: &mut [OwnCell], command: &Command, cfg: &Config) {
    for cell in own.iter_mut() {
        if cell.is_fast {
            continue;
        }
        let max_speed = cell.max_speed(cfg);
        let desired = geometry::with_length(command.target - cell.pos, max_speed);
        cell.v += (desired - cell.v) * (cfg.inertion_factor / cell.m.max(1e-6));
        cell.v = geometry::with_length(cell.v, cell.v.length().min(max_speed));
    }
}

/// Step 2: periodic mass decay toward `MIN_SHRINK_MASS`.
fn shrink(own: &mut [OwnCell], next_tick: u64, cfg: &Config) {
    if next_tick % cfg.shrink_every_tick as u64 != 0 {
        return;
    }
    for cell in own.iter_mut() {
        if cell.m > cfg.min_shrink_mass {
            cell.m -= (cell.m - cfg.min_shrink_mass) * cfg.shrink_factor;
        }
    }
}

/// Step 3: food, then ejections, then enemies eaten by the nearest eligible own cell.
fn eat_pellets(state: &mut Snapshot, cfg: &Config) {
    for kind in [PelletKind::Food, PelletKind::Ejection] {
        let ids: Vec<EntityId> = state
            .food
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.id.clone())
            .collect();
        for id in ids {
            if state.eaten.contains(&id) {
                continue;
            }
            let Some(pellet) = state.food.iter().find(|p| p.id == id).cloned() else {
                continue;
            };
            if let Some(best) = nearest_eater(&state.own, &pellet, cfg) {
                state.own[best].m += pellet.m;
                state.eaten.insert(id);
            }
        }
    }
}

fn eat_enemies(state: &mut Snapshot, cfg: &Config) {
    for enemy in state.enemies.clone() {
        if state.eaten.contains(&enemy.id) {
            continue;
        }
        if let Some(best) = nearest_eater(&state.own, &enemy, cfg) {
            state.own[best].m += enemy.m;
            state.eaten.insert(enemy.id.clone());
        }
    }
}

/// Index of the nearest own cell that `can_eat` `target`, if any.
fn nearest_eater(own: &[OwnCell], target: &impl entities::Blob, cfg: &Config) -> Option<usize> {
    own.iter()
        .enumerate()
        .filter(|(_, cell)| cell.can_eat(target, cfg))
        .min_by(|(_, a), (_, b)| {
            geometry::qdist(a.pos, target.center())
                .partial_cmp(&geometry::qdist(b.pos, target.center()))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Step 4: for each enemy not yet eaten, the nearest own cell it can eat dies.
fn eat_by_enemies(state: &Snapshot, cfg: &Config) -> HashSet<usize> {
    let mut dead = HashSet::new();
    for enemy in &state.enemies {
        if state.eaten.contains(&enemy.id) {
            continue;
        }
        let mut best: Option<(usize, f32)> = None;
        for (i, cell) in state.own.iter().enumerate() {
            if dead.contains(&i) || !entities::can_eat(enemy, cell, cfg) {
                continue;
            }
            let d = geometry::qdist(enemy.pos, cell.pos);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        if let Some((i, _)) = best {
            dead.insert(i);
        }
    }
    dead
}

fn eat_enemies_then_remove_victims(state: &mut Snapshot, cfg: &Config) {
    let dead = eat_by_enemies(state, cfg);
    if dead.is_empty() {
        return;
    }
    let mut i = 0;
    state.own.retain(|_| {
        let keep = !dead.contains(&i);
        i += 1;
        keep
    });
}

/// Step 5: each virus kills the nearest own cell it `can_hurt` among those that `can_burst`.
fn virus_collisions(state: &mut Snapshot, cfg: &Config) {
    eat_enemies_then_remove_victims(state, cfg);

    let mut dead = HashSet::new();
    for virus in &state.viruses {
        let mut best: Option<(usize, f32)> = None;
        for (i, cell) in state.own.iter().enumerate() {
            if dead.contains(&i) || !cell.can_burst(cfg) {
                continue;
            }
            let d = geometry::qdist(virus.pos, cell.pos);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        if let Some((i, _)) = best {
            if virus.can_hurt(&state.own[i], cfg) {
                dead.insert(i);
            }
        }
    }
    if dead.is_empty() {
        return;
    }
    let mut i = 0;
    state.own.retain(|_| {
        let keep = !dead.contains(&i);
        i += 1;
        keep
    });
}

/// Step 6: recompute radius from mass and re-cap non-fast speed at the new max.
fn refresh_radius_and_speed(own: &mut [OwnCell], cfg: &Config) {
    for cell in own.iter_mut() {
        cell.r = cfg.radius_for_mass(cell.m);
        if !cell.is_fast {
            let max_speed = cell.max_speed(cfg);
            cell.v = geometry::with_length(cell.v, cell.v.length().min(max_speed));
        }
    }
}

/// Step 7: split every eligible own cell into two equal-mass halves.
fn split(own: &mut Vec<OwnCell>, cfg: &Config) {
    let mut spawned = Vec::new();
    for cell in own.iter_mut() {
        if !cell.can_split(cfg) {
            continue;
        }
        let half = cell.m / 2.0;
        let angle = geometry::angle(cell.v);
        let sibling = OwnCell {
            id: format!("{}b", cell.id),
            pos: cell.pos,
            r: cfg.radius_for_mass(half),
            m: half,
            v: geometry::from_polar(cfg.split_start_speed, angle),
            is_fast: true,
            ttf: cfg.ticks_til_fusion,
        };
        cell.id = format!("{}a", cell.id);
        cell.m = half;
        cell.r = cfg.radius_for_mass(half);
        cell.ttf = cfg.ticks_til_fusion;
        spawned.push(sibling);
    }
    own.extend(spawned);
}

/// Step 8: integrate position, then clamp into the arena.
fn mov(own: &mut [OwnCell], cfg: &Config) {
    for cell in own.iter_mut() {
        cell.pos += cell.v;
        cell.pos = geometry::clamp_to_arena(cell.pos, cell.r, cfg.game_width, cfg.game_height);
    }
}

/// Step 9: fast cells decelerate by `VISCOSITY`, dropping the fast flag once they hit max speed.
fn apply_viscosity(own: &mut [OwnCell], cfg: &Config) {
    for cell in own.iter_mut() {
        if !cell.is_fast {
            continue;
        }
        let max_speed = cell.max_speed(cfg);
        let speed = cell.v.length();
        let new_speed = (speed - cfg.viscosity).max(max_speed);
        cell.v = geometry::with_length(cell.v, new_speed);
        if new_speed <= max_speed {
            cell.is_fast = false;
        }
    }
}

/// Step 10: fusion countdown, saturating at zero. Fusion merging itself is
/// out of scope (spec §4.4 step 10, §9 open question) — TODO: merge siblings
/// once `ttf` reaches zero and they overlap.
fn tick_fusion(own: &mut [OwnCell]) {
    for cell in own.iter_mut() {
        cell.ttf = cell.ttf.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Enemy, Pellet, Virus};

    fn cfg() -> Config {
        Config::default()
    }

    fn own_snapshot(m: f32, pos: Vec2) -> Snapshot {
        let cfg = cfg();
        let mut snap = Snapshot::new(0);
        snap.own.push(OwnCell::new("a", pos, m, Vec2::ZERO, &cfg));
        snap
    }

    #[test]
    fn dead_state_predicts_to_dead_state() {
        let cfg = cfg();
        let state = Snapshot::new(0);
        let next = predict(&state, &Command::neutral(), &cfg);
        assert!(next.is_dead());
        assert_eq!(next.tick, 1);
    }

    #[test]
    fn own_cell_moves_toward_command_and_stays_in_bounds() {
        let cfg = cfg();
        let state = own_snapshot(20.0, Vec2::new(5.0, 5.0));
        let cmd = Command::new(Vec2::new(10.0, 10.0), false, &cfg);
        let next = predict(&state, &cmd, &cfg);
        let cell = &next.own[0];
        assert!(cell.r <= cell.pos.x && cell.pos.x <= cfg.game_width - cell.r);
        assert!(cell.r <= cell.pos.y && cell.pos.y <= cfg.game_height - cell.r);
    }

    #[test]
    fn eating_food_increases_mass_and_is_idempotent() {
        let cfg = cfg();
        let mut state = own_snapshot(100.0, Vec2::new(20.0, 0.0));
        let pellet = Pellet::food(Vec2::new(20.0, 0.0), &cfg);
        state.food.push(pellet.clone());

        let next = predict(&state, &Command::neutral(), &cfg);
        assert!((next.own[0].m - (100.0 + cfg.food_mass)).abs() < 1e-4);
        assert!(next.eaten.contains(&pellet.id));

        // already-eaten food is not credited again
        let mut already_eaten = state.clone();
        already_eaten.eaten.insert(pellet.id.clone());
        let next2 = predict(&already_eaten, &Command::neutral(), &cfg);
        assert!((next2.own[0].m - 100.0).abs() < 1e-4);
    }

    #[test]
    fn bigger_enemy_eats_own_cell() {
        let cfg = cfg();
        let mut state = own_snapshot(10.0, Vec2::new(0.0, 0.0));
        state.enemies.push(Enemy {
            id: "e".into(),
            pos: Vec2::new(1.0, 0.0),
            r: cfg.radius_for_mass(100.0),
            m: 100.0,
        });
        let next = predict(&state, &Command::neutral(), &cfg);
        assert!(next.is_dead());
    }

    #[test]
    fn virus_bursts_an_eligible_cell() {
        let cfg = cfg();
        let mut state = own_snapshot(cfg.min_burst_mass * 2.5, Vec2::new(1.0, 0.0));
        state.viruses.push(Virus::new("v", Vec2::ZERO, 40.0, &cfg));
        let next = predict(&state, &Command::neutral(), &cfg);
        assert!(next.is_dead());
    }

    #[test]
    fn split_produces_two_equal_mass_fast_siblings() {
        let cfg = cfg();
        let m = cfg.min_split_mass + 50.0;
        let state = own_snapshot(m, Vec2::new(100.0, 100.0));
        let cmd = Command::new(Vec2::new(100.0, 100.0), true, &cfg);
        let next = predict(&state, &cmd, &cfg);
        assert_eq!(next.own.len(), 2);
        let total: f32 = next.own.iter().map(|c| c.m).sum();
        assert!((total - m).abs() < 1e-3);
        assert!(next.own.iter().all(|c| c.ttf == cfg.ticks_til_fusion));
        assert!(next.own.iter().any(|c| c.is_fast && (c.v.length() - cfg.split_start_speed).abs() < 1.0));
    }

    #[test]
    fn mass_is_monotone_absent_death() {
        let cfg = cfg();
        let state = own_snapshot(50.0, Vec2::new(300.0, 300.0));
        let pre_mass = state.total_mass();
        let next = predict(&state, &Command::neutral(), &cfg);
        assert!(next.total_mass() >= pre_mass - 1e-4);
    }
}
