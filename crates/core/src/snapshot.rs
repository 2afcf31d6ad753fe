//! The per-tick world snapshot (spec §3 Data Model, §4.3).

use std::collections::HashSet;

use crate::entities::{Enemy, EntityId, OwnCell, Pellet, Virus};

/// A parsed (real or predicted) view of the world for one tick.
///
/// Own cells are always kept sorted by `(mass desc, is_fast desc)` so index
/// 0 is the primary cell (spec §4.3, GLOSSARY). `eaten` accumulates the ids
/// of food/ejections/enemies consumed along one simulated branch so the
/// predictor never double-counts a pellet (spec §4.4 step 3, §8 "eat
/// idempotence").
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tick: u64,
    pub own: Vec<OwnCell>,
    pub food: Vec<Pellet>,
    pub viruses: Vec<Virus>,
    pub enemies: Vec<Enemy>,
    pub eaten: HashSet<EntityId>,
}

impl Snapshot {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    /// Sort own cells by `(mass desc, is_fast desc)` so index 0 is primary.
    pub fn sort_own(&mut self) {
        self.own.sort_by(|a, b| {
            b.m.partial_cmp(&a.m)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.is_fast.cmp(&a.is_fast))
        });
    }

    /// The largest own cell, tie-broken by `is_fast` (spec GLOSSARY, "Primary").
    #[inline]
    pub fn primary(&self) -> Option<&OwnCell> {
        self.own.first()
    }

    /// True iff the agent has no own cells left (spec §4.6.8, "dead").
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.own.is_empty()
    }

    /// Total mass across all own cells.
    pub fn total_mass(&self) -> f32 {
        self.own.iter().map(|c| c.m).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use glam::Vec2;

    #[test]
    fn sort_own_orders_by_mass_then_fast() {
        let cfg = Config::default();
        let mut snap = Snapshot::new(0);
        let mut small = OwnCell::new("a", Vec2::ZERO, 10.0, Vec2::ZERO, &cfg);
        small.is_fast = true;
        let big = OwnCell::new("b", Vec2::ZERO, 50.0, Vec2::ZERO, &cfg);
        let tied_slow = OwnCell::new("c", Vec2::ZERO, 10.0, Vec2::ZERO, &cfg);
        snap.own = vec![small.clone(), big.clone(), tied_slow.clone()];
        snap.sort_own();
        assert_eq!(snap.own[0].id, "b");
        assert_eq!(snap.own[1].id, "a"); // fast beats non-fast at equal mass
        assert_eq!(snap.own[2].id, "c");
        assert_eq!(snap.primary().unwrap().id, "b");
    }

    #[test]
    fn dead_snapshot_has_no_primary() {
        let snap = Snapshot::new(0);
        assert!(snap.is_dead());
        assert!(snap.primary().is_none());
    }
}
