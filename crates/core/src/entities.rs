//! Game entities and their predicates (spec §4.2).
//!
//! All entity types are plain value structs; the predicates that used to
//! live on a `Point -> Circle -> Blob -> Player` hierarchy are free functions
//! over the concrete types plus the [`crate::geometry::Circle`] /
//! [`crate::geometry::HasMass`] traits, per the teacher's `Cell` trait in
//! `entity/cell.rs`.

use glam::Vec2;

use crate::config::Config;
use crate::geometry::{self, Circle, HasMass};

/// Opaque entity identifier. Own cells and enemies carry a wire-assigned id;
/// food/ejection ids are a compact hash of rounded position (§9 design notes).
pub type EntityId = String;

/// One of the agent's own cells (spec §3 Data Model, `OwnCell`).
#[derive(Debug, Clone, PartialEq)]
pub struct OwnCell {
    pub id: EntityId,
    pub pos: Vec2,
    pub r: f32,
    pub m: f32,
    pub v: Vec2,
    pub is_fast: bool,
    pub ttf: u32,
}

impl Circle for OwnCell {
    fn center(&self) -> Vec2 {
        self.pos
    }
    fn radius(&self) -> f32 {
        self.r
    }
}

impl HasMass for OwnCell {
    fn mass(&self) -> f32 {
        self.m
    }
}

impl OwnCell {
    pub fn new(id: impl Into<EntityId>, pos: Vec2, m: f32, v: Vec2, cfg: &Config) -> Self {
        Self {
            id: id.into(),
            pos,
            r: cfg.radius_for_mass(m),
            m,
            v,
            is_fast: false,
            ttf: 0,
        }
    }

    /// `SPEED_FACTOR / sqrt(m)`.
    #[inline]
    pub fn max_speed(&self, cfg: &Config) -> f32 {
        cfg.max_speed(self.m)
    }

    /// True iff this cell is large enough, and has enough parts, to burst on a virus.
    #[inline]
    pub fn can_burst(&self, cfg: &Config) -> bool {
        self.m >= 2.0 * cfg.min_burst_mass && (self.m / cfg.min_burst_mass).floor() > 1.0
    }

    /// True iff this cell has enough mass to split.
    #[inline]
    pub fn can_split(&self, cfg: &Config) -> bool {
        self.m > cfg.min_split_mass
    }

    /// True iff `self` can eat `other` (spec §4.2): `self` is massive enough,
    /// and `other`'s center (plus the overlap threshold) lies inside `self`.
    pub fn can_eat(&self, other: &impl Blob, cfg: &Config) -> bool {
        can_eat(self, other, cfg)
    }

    /// Same rule as [`Self::can_eat`] — an enemy that `self` can eat can also hurt it back.
    #[inline]
    pub fn can_hurt(&self, other: &impl Blob, cfg: &Config) -> bool {
        self.can_eat(other, cfg)
    }

    /// True iff `other` lies within `self`'s vision circle, shifted forward
    /// along `self.v` by `VIS_SHIFT` (spec §4.2).
    pub fn can_see(&self, other: &impl Blob, cfg: &Config) -> bool {
        let shift = geometry::with_length(self.v, cfg.vis_shift);
        let center = self.pos + shift;
        let vis_r = self.r * cfg.vis_factor + other.radius();
        center.distance(other.center()) <= vis_r
    }
}

/// A trait unifying every circular, massive entity so predicates can be
/// written generically over own cells, enemies, food, ejections, and viruses.
pub trait Blob: Circle + HasMass {}
impl<T: Circle + HasMass> Blob for T {}

/// Free-standing form of the eat predicate (spec §4.2), usable with any
/// eater/victim pair — including an enemy eating one of our own cells
/// (spec §4.4 step 4, "being eaten"), which has no dedicated method since
/// enemies are otherwise treated as static, behaviorless blobs.
pub fn can_eat(eater: &impl Blob, victim: &impl Blob, cfg: &Config) -> bool {
    eater.mass() > victim.mass() * cfg.mass_eat_factor
        && eater.center().distance(victim.center()) - victim.radius() * (1.0 - 2.0 * cfg.diam_eat_factor)
            < eater.radius()
}

/// An opponent's cell (spec §3 Data Model, `Enemy`). Treated as static: no
/// velocity is reported or predicted (spec §9 open question, resolved
/// conservatively).
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EntityId,
    pub pos: Vec2,
    pub r: f32,
    pub m: f32,
}

impl Circle for Enemy {
    fn center(&self) -> Vec2 {
        self.pos
    }
    fn radius(&self) -> f32 {
        self.r
    }
}
impl HasMass for Enemy {
    fn mass(&self) -> f32 {
        self.m
    }
}

/// A food pellet or an ejected-mass pellet; both share the `Food`/`Ejection`
/// shape of spec §3 (`id`, `x`, `y`, `r`, `m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PelletKind {
    Food,
    Ejection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pellet {
    pub id: EntityId,
    pub kind: PelletKind,
    pub pos: Vec2,
    pub r: f32,
    pub m: f32,
}

impl Circle for Pellet {
    fn center(&self) -> Vec2 {
        self.pos
    }
    fn radius(&self) -> f32 {
        self.r
    }
}
impl HasMass for Pellet {
    fn mass(&self) -> f32 {
        self.m
    }
}

impl Pellet {
    pub fn food(pos: Vec2, cfg: &Config) -> Self {
        Self {
            id: food_id(pos, PelletKind::Food),
            kind: PelletKind::Food,
            pos,
            r: cfg.food_radius,
            m: cfg.food_mass,
        }
    }

    pub fn ejection(pos: Vec2, cfg: &Config) -> Self {
        Self {
            id: food_id(pos, PelletKind::Ejection),
            kind: PelletKind::Ejection,
            pos,
            r: cfg.ejection_radius,
            m: cfg.ejection_mass,
        }
    }
}

/// Derive a stable synthetic id from a rounded position, matching the wire
/// schema's `"F<X.1>[Y.1]"` / `"E<X.1>[Y.1]"` convention (spec §6.1, §9). The
/// prefix disambiguates kind; the payload is the position rounded to one
/// decimal place so identical pellets across ticks share an id.
pub fn food_id(pos: Vec2, kind: PelletKind) -> EntityId {
    let prefix = match kind {
        PelletKind::Food => 'F',
        PelletKind::Ejection => 'E',
    };
    let rx = (pos.x * 10.0).round() / 10.0;
    let ry = (pos.y * 10.0).round() / 10.0;
    format!("{prefix}{rx:.1}[{ry:.1}]")
}

/// A virus (spec §3 Data Model, `Virus`).
#[derive(Debug, Clone, PartialEq)]
pub struct Virus {
    pub id: EntityId,
    pub pos: Vec2,
    pub m: f32,
    pub r: f32,
}

impl Circle for Virus {
    fn center(&self) -> Vec2 {
        self.pos
    }
    fn radius(&self) -> f32 {
        self.r
    }
}
impl HasMass for Virus {
    fn mass(&self) -> f32 {
        self.m
    }
}

impl Virus {
    pub fn new(id: impl Into<EntityId>, pos: Vec2, m: f32, cfg: &Config) -> Self {
        Self {
            id: id.into(),
            pos,
            m,
            r: cfg.virus_radius,
        }
    }

    /// True iff this virus can hurt `other`: `other` must be radius-eligible
    /// and able to burst, and must actually overlap within `RAD_HURT_FACTOR`
    /// of the virus's radius (spec §4.2).
    pub fn can_hurt(&self, other: &OwnCell, cfg: &Config) -> bool {
        if other.r < self.r || !other.can_burst(cfg) {
            return false;
        }
        geometry::qdist(self.pos, other.pos) < (self.r * cfg.rad_hurt_factor + other.r).powi(2)
    }
}

/// A movement command: a target point plus an optional split flag (spec §3
/// Data Model, `Command`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub target: Vec2,
    pub split: bool,
}

impl Command {
    /// Build a command, clamping the target into `[0, w] x [0, h]` (spec §3,
    /// §6.1 — unlike cell positions, the *target* clamps to the full arena,
    /// not `[r, w-r]`).
    pub fn new(target: Vec2, split: bool, cfg: &Config) -> Self {
        Self {
            target: Vec2::new(
                target.x.clamp(0.0, cfg.game_width),
                target.y.clamp(0.0, cfg.game_height),
            ),
            split,
        }
    }

    /// A stationary, non-splitting command, used as the dead/neutral fallback (spec §4.6.8).
    pub fn neutral() -> Self {
        Self {
            target: Vec2::ZERO,
            split: false,
        }
    }
}
