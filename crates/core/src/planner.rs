//! The planner: maintains the search tree across ticks (spec §4.6).

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use rand::Rng;

use crate::config::{tuning, Config};
use crate::entities::Command;
use crate::geometry;
use crate::predictor::predict;
use crate::scoring;
use crate::snapshot::Snapshot;
use crate::tree::{NodeIndex, Tree};

/// Cadence (in ticks) at which the fallback split policy fires (spec §4.6.7,
/// "simpler variants" — a split at a fixed cadence when mass permits).
const SPLIT_CADENCE: u32 = 50;

/// Maximum chain length explored by one discovery direction (spec §4.6.5);
/// a hard cap so a direction that never loses sight of itself cannot grow
/// the tree without bound.
const MAX_DISCOVERY_DEPTH: usize = 8;

/// The result of one call to [`Planner::tick`]: the command to emit, plus a
/// short human-readable reason for operator debugging (spec §6.1 `Debug`).
#[derive(Debug, Clone)]
pub struct Decision {
    pub command: Command,
    pub debug: String,
}

/// Maintains the tree across ticks: re-roots it, expands tips, selects among
/// tips, backpropagates scores, and pops the next command (spec §4.6.1).
pub struct Planner {
    tree: Option<Tree>,
    tips: HashSet<NodeIndex>,
    commands: VecDeque<Command>,
    /// The previously-committed next-root candidate, checked against the
    /// freshly observed position at the top of the next tick (spec §4.6.2).
    pending_next_root: Option<NodeIndex>,
    last_command: Command,
    ticks_since_split: u32,
    wander_target: Vec2,
    wander_tick: u32,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    pub fn new() -> Self {
        Self {
            tree: None,
            tips: HashSet::new(),
            commands: VecDeque::new(),
            pending_next_root: None,
            last_command: Command::neutral(),
            ticks_since_split: 0,
            wander_target: Vec2::ZERO,
            wander_tick: 0,
        }
    }

    /// Run one planning tick and return the command to emit (spec §4).
    pub fn tick(&mut self, observed: Snapshot, cfg: &Config, rng: &mut impl Rng) -> Decision {
        if observed.is_dead() {
            // Failure semantics (spec §4.6.8): emit the last command, or neutral.
            return Decision {
                command: self.last_command,
                debug: "died".to_string(),
            };
        }

        self.manage_root(&observed, cfg);

        let decision = self.commit_if_empty(cfg);
        self.run_expansions(cfg, rng);

        let command = self.commands.pop_front().unwrap_or_else(|| self.wander(cfg));
        self.last_command = command;
        Decision {
            command,
            debug: decision.unwrap_or_else(|| format!("tips={} queue={}", self.tips.len(), self.commands.len())),
        }
    }

    fn manage_root(&mut self, observed: &Snapshot, cfg: &Config) {
        let observed_primary = observed.primary().map(|c| c.pos);

        let needs_reset = match (&self.tree, observed_primary) {
            (None, _) => true,
            (Some(tree), Some(obs_pos)) => {
                let root_pos = tree.root_node().state.primary().map(|c| c.pos);
                match root_pos {
                    Some(rp) => geometry::qdist(rp, obs_pos) > tuning::ROOT_EPS * tuning::ROOT_EPS && self.commands.is_empty(),
                    None => true,
                }
            }
            _ => true,
        };

        if needs_reset {
            // Discovery is seeded by `commit_if_empty` (spec §4.6.6 step 4),
            // not here: `commands` is empty after a reset, so `tick()` runs
            // straight into a commit on the same tick. Seeding here too would
            // double the discovery branches and break the §8 "root reset
            // safety" invariant (`tips == {root}` right after reset).
            tracing::debug!(tick = observed.tick, "root reset");
            self.tree = Some(Tree::reset(observed.clone()));
            self.tips.clear();
            self.tips.insert(self.tree.as_ref().unwrap().root);
            self.commands.clear();
            self.pending_next_root = None;
            return;
        }

        let Some(obs_pos) = observed_primary else { return };
        let Some(next_root) = self.pending_next_root else { return };

        let (candidate_pos, root_pos) = {
            let tree = self.tree.as_ref().unwrap();
            let candidate_pos = tree.get(next_root).state.primary().map(|c| c.pos);
            let root_pos = tree.root_node().state.primary().map(|c| c.pos);
            (candidate_pos, root_pos)
        };

        let (Some(candidate_pos), Some(root_pos)) = (candidate_pos, root_pos) else {
            self.pending_next_root = None;
            return;
        };

        if geometry::qdist(candidate_pos, obs_pos) < geometry::qdist(root_pos, obs_pos) {
            let dropped = self.tree.as_mut().unwrap().advance_root(next_root);
            tracing::debug!(dropped = dropped.len(), "advance root");
            for idx in dropped {
                self.tips.remove(&idx);
            }
            self.pending_next_root = None;
        }
    }

    /// `skips = max(1, floor(SKIP_DISTANCE / primary.max_speed()))` (spec §4.6.3).
    fn skips(&self, cfg: &Config) -> usize {
        let Some(tree) = &self.tree else { return 1 };
        let Some(primary) = tree.root_node().state.primary() else {
            return 1;
        };
        let max_speed = primary.max_speed(cfg);
        if max_speed <= 0.0 {
            return 1;
        }
        (tuning::SKIP_DISTANCE / max_speed).floor().max(1.0) as usize
    }

    fn commit_if_empty(&mut self, cfg: &Config) -> Option<String> {
        if !self.commands.is_empty() {
            return None;
        }
        let Some(tree) = &self.tree else { return None };
        // `tips` is a `HashSet`, whose iteration order is randomized per
        // process by `RandomState` — picking the max straight off that
        // order would let ties (e.g. two tips both scoring 0.0) resolve
        // differently across otherwise-identical runs, breaking the §8
        // determinism property. Sort by node index first so ties always
        // resolve to the lowest index, deterministically.
        let mut sorted_tips: Vec<NodeIndex> = self.tips.iter().copied().collect();
        sorted_tips.sort_unstable();
        let best = sorted_tips.into_iter().fold(None, |acc: Option<NodeIndex>, idx| match acc {
            Some(best_idx) if tree.get(best_idx).score >= tree.get(idx).score => Some(best_idx),
            _ => Some(idx),
        });

        let Some(best_tip) = best else {
            // No candidates yet (e.g. right after a reset, before discovery
            // has produced anything usable): fall back to the wander policy.
            let cmd = self.wander(cfg);
            self.commands.push_back(cmd);
            return Some("wander: no tips".to_string());
        };

        // Walk from the tip toward the root, stopping one level below it.
        let mut next_root = best_tip;
        loop {
            let parent = tree.get(next_root).parent;
            match parent {
                Some(p) if p != tree.root => next_root = p,
                _ => break,
            }
        }

        let best_score = tree.get(best_tip).score;
        let mut commands = tree.get(next_root).commands.clone();
        self.maybe_split(&mut commands, cfg);
        for cmd in commands {
            self.commands.push_back(cmd);
        }
        self.pending_next_root = Some(next_root);
        self.seed_discovery(cfg);
        Some(format!("commit next_root score={best_score:.1}"))
    }

    /// Fixed-cadence split policy (spec §4.6.7): split on the first command
    /// of the newly committed sequence when mass permits and the cadence elapsed.
    fn maybe_split(&mut self, commands: &mut [Command], cfg: &Config) {
        self.ticks_since_split = self.ticks_since_split.saturating_add(1);
        if self.ticks_since_split < SPLIT_CADENCE {
            return;
        }
        let Some(tree) = &self.tree else { return };
        let Some(primary) = tree.root_node().state.primary() else {
            return;
        };
        if !primary.can_split(cfg) {
            return;
        }
        if let Some(first) = commands.first_mut() {
            first.split = true;
            self.ticks_since_split = 0;
        }
    }

    fn run_expansions(&mut self, cfg: &Config, rng: &mut impl Rng) {
        for _ in 0..tuning::EXPANSIONS_PER_TICK {
            let Some(tree) = &self.tree else { return };
            let Some(target) = descend(tree, tree.root, rng) else {
                continue;
            };
            self.expand(target, cfg);
        }
    }

    /// A single expansion from node `n` (spec §4.6.4).
    ///
    /// Panics if `n` is not currently a tip: expanding an already-expanded
    /// node is a planner invariant breach, not a recoverable condition
    /// (spec §7).
    fn expand(&mut self, n: NodeIndex, cfg: &Config) {
        assert!(self.tips.remove(&n), "expand: node {n} is not a tip (already expanded)");
        let skips = self.skips(cfg);
        let tree = self.tree.as_mut().unwrap();
        let state = tree.get(n).state.clone();
        let Some(primary) = state.primary() else {
            return;
        };
        let base_angle = geometry::angle(primary.v);
        let primary_pos = primary.pos;

        let mut children = Vec::new();
        for rel in tuning::EXPAND_ANGLES {
            let dir = geometry::from_polar(cfg.speed_factor, base_angle + rel);
            let command = Command::new(primary_pos + dir, false, cfg);
            let mut current = state.clone();
            for _ in 0..skips {
                current = predict(&current, &command, cfg);
            }
            let score = scoring::score(&current, cfg);
            let child = tree.add_child(n, current.clone(), vec![command; skips]);
            let node = tree.get_mut(child);
            node.score = score;
            node.expandable = !current.is_dead();
            children.push(child);
        }
        for child in &children {
            self.tips.insert(*child);
        }
        tree.backpropagate(n);
    }

    /// Seed `DISCOVERY_ANGLES` equally-spaced directions from the current
    /// root (spec §4.6.5).
    fn seed_discovery(&mut self, cfg: &Config) {
        let Some((root, root_primary)) = (match &self.tree {
            Some(tree) => tree.get(tree.root).state.primary().cloned().map(|p| (tree.root, p)),
            None => None,
        }) else {
            return;
        };

        for i in 0..tuning::DISCOVERY_ANGLES {
            let angle = std::f32::consts::TAU * (i as f32) / (tuning::DISCOVERY_ANGLES as f32);
            let mut parent = root;
            let mut state = self.tree.as_ref().unwrap().get(root).state.clone();
            let mut last_pos = root_primary.pos;

            for depth in 1..=MAX_DISCOVERY_DEPTH {
                let dir = geometry::from_polar(cfg.speed_factor, angle);
                let target = last_pos + dir;
                let command = Command::new(target, false, cfg);
                let next_state = predict(&state, &command, cfg);

                let Some(next_primary) = next_state.primary() else {
                    break;
                };
                let moved = geometry::qdist(next_primary.pos, last_pos).sqrt();
                let still_visible = root_primary.can_see(next_primary, cfg);
                if !still_visible || moved < tuning::ROOT_EPS {
                    break;
                }
                let next_pos = next_primary.pos;

                let score = scoring::score(&next_state, cfg);
                let is_dead = next_state.is_dead();
                let tree = self.tree.as_mut().unwrap();
                let child = tree.add_child(parent, next_state.clone(), vec![command]);
                let node = tree.get_mut(child);
                node.score = score;
                node.expandable = depth >= tuning::MIN_EXPANSION_DEPTH && !is_dead;
                let expandable = node.expandable;
                if expandable {
                    self.tips.insert(child);
                }

                last_pos = next_pos;
                state = next_state;
                parent = child;
            }
            self.tree.as_mut().unwrap().backpropagate(parent);
        }
    }

    /// Root-reset wander (spec SPEC_FULL §2): re-pick a random point every
    /// `FALLBACK_SKIP` ticks, mirroring the reference `Skipper` strategy.
    fn wander(&mut self, cfg: &Config) -> Command {
        if self.wander_tick % tuning::FALLBACK_SKIP == 0 {
            // A fixed, deterministic-enough pseudo-random point: derived from
            // the tick counter so no extra RNG draw is needed on this path.
            let t = self.wander_tick as f32;
            let x = (t * 0.61803398875).fract() * cfg.game_width;
            let y = (t * 0.38196601125).fract() * cfg.game_height;
            self.wander_target = Vec2::new(x, y);
        }
        self.wander_tick = self.wander_tick.wrapping_add(1);
        Command::new(self.wander_target, false, cfg)
    }
}

/// Weighted-random descent from `start` to an expandable leaf (spec §4.6.4).
/// Returns `None` if descent bottoms out at a non-expandable leaf (e.g. a
/// dead node), in which case this expansion round is simply skipped.
fn descend(tree: &Tree, start: NodeIndex, rng: &mut impl Rng) -> Option<NodeIndex> {
    let mut current = start;
    loop {
        let node = tree.get(current);
        if node.children.is_empty() {
            return if node.expandable { Some(current) } else { None };
        }
        let weights: Vec<f32> = node
            .children
            .iter()
            .map(|&c| {
                let child = tree.get(c);
                if child.subtree_size == 0 {
                    0.0
                } else {
                    (child.subtree_score_sum / child.subtree_size as f32).max(0.0)
                }
            })
            .collect();
        let total: f32 = weights.iter().sum();
        let chosen = if total <= 0.0 {
            node.children[0]
        } else {
            let mut roll = rng.random_range(0.0..total);
            let mut pick = node.children[0];
            for (i, w) in weights.iter().enumerate() {
                if roll < *w {
                    pick = node.children[i];
                    break;
                }
                roll -= *w;
            }
            pick
        };
        current = chosen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OwnCell;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn cfg() -> Config {
        Config::default()
    }

    fn snapshot_with_cell(pos: Vec2, m: f32, cfg: &Config) -> Snapshot {
        let mut snap = Snapshot::new(0);
        snap.own.push(OwnCell::new("a", pos, m, Vec2::ZERO, cfg));
        snap
    }

    #[test]
    fn first_tick_emits_in_bounds_command() {
        let cfg = cfg();
        let mut planner = Planner::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let snap = snapshot_with_cell(Vec2::new(5.0, 5.0), 10.0, &cfg);
        let decision = planner.tick(snap, &cfg, &mut rng);
        assert!(decision.command.target.x >= 0.0 && decision.command.target.x <= cfg.game_width);
        assert!(decision.command.target.y >= 0.0 && decision.command.target.y <= cfg.game_height);
    }

    #[test]
    fn dead_observation_returns_last_command() {
        let cfg = cfg();
        let mut planner = Planner::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let alive = snapshot_with_cell(Vec2::new(100.0, 100.0), 10.0, &cfg);
        let first = planner.tick(alive, &cfg, &mut rng).command;

        let dead = Snapshot::new(1);
        let decision = planner.tick(dead, &cfg, &mut rng);
        assert_eq!(decision.command, first);
        assert_eq!(decision.debug, "died");
    }

    #[test]
    fn reset_yields_empty_queue_and_single_tip() {
        let cfg = cfg();
        let mut planner = Planner::new();
        let mut rng = SmallRng::seed_from_u64(7);
        let snap = snapshot_with_cell(Vec2::new(300.0, 300.0), 10.0, &cfg);
        planner.manage_root(&snap, &cfg);
        assert!(planner.tree.is_some());
        assert_eq!(planner.commands.len(), 0);
        assert_eq!(planner.tips.len(), 1);
        assert!(planner.tips.contains(&planner.tree.as_ref().unwrap().root));
    }

    #[test]
    fn repeated_ticks_stay_within_time_budget_shape() {
        let cfg = cfg();
        let mut planner = Planner::new();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut pos = Vec2::new(330.0, 330.0);
        for _ in 0..5 {
            let snap = snapshot_with_cell(pos, 15.0, &cfg);
            let decision = planner.tick(snap, &cfg, &mut rng);
            assert!(decision.command.target.x.is_finite());
            pos += Vec2::new(1.0, 0.0);
        }
    }
}
