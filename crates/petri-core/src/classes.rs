//! Class identities and their ability loadouts.
//!
//! A class is picked once, at the mass gate, and never changes. Each class
//! carries a fixed ability list; per-ability cooldowns and upgrade tiers
//! live in [`ClassState`] so the table itself stays static.

use crate::config::ArenaConfig;
use serde::{Deserialize, Serialize};

/// The six playable identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    /// Converts everything it eats into an orbiting undead swarm.
    Necromancer,
    /// Drops ice walls and reassembles scattered cells on demand.
    Mage,
    /// Trades agility for momentum: charges and kinetic buildup.
    Juggernaut,
    /// Infests victims with webbing that slows and spreads.
    Broodmother,
    /// Hires worker drones that ferry food home.
    Overseer,
    /// Unleashes purge waves that rot a share of the arena.
    Purifier,
}

impl ClassKind {
    pub const ALL: [ClassKind; 6] = [
        ClassKind::Necromancer,
        ClassKind::Mage,
        ClassKind::Juggernaut,
        ClassKind::Broodmother,
        ClassKind::Overseer,
        ClassKind::Purifier,
    ];

    #[must_use]
    pub fn spec(self) -> &'static ClassSpec {
        match self {
            ClassKind::Necromancer => &NECROMANCER,
            ClassKind::Mage => &MAGE,
            ClassKind::Juggernaut => &JUGGERNAUT,
            ClassKind::Broodmother => &BROODMOTHER,
            ClassKind::Overseer => &OVERSEER,
            ClassKind::Purifier => &PURIFIER,
        }
    }

    #[must_use]
    pub fn color(self) -> [u8; 3] {
        self.spec().color
    }

    #[must_use]
    pub fn abilities(self) -> &'static [AbilityKey] {
        self.spec().abilities
    }

    #[must_use]
    pub fn has_ability(self, key: AbilityKey) -> bool {
        self.abilities().contains(&key)
    }
}

/// Every ability in the game, across all classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKey {
    /// Swap bodies with the largest zombie in the swarm.
    Possess,
    /// Raise a frozen barrier perpendicular to the cursor.
    IceWall,
    /// Pull every cell back into one, fast and without an eat window.
    Reform,
    /// A time-boxed thrust burst toward the cursor.
    Charge,
    /// Launch a web bolt that seeds an infestation on impact.
    Infest,
    /// Spend mass to recruit a gathering drone.
    Hire,
    /// Scorch a sampled share of the arena with accelerated decay.
    Purge,
}

impl AbilityKey {
    pub const COUNT: usize = 7;

    /// Dense index for per-ability state arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AbilityKey::Possess => 0,
            AbilityKey::IceWall => 1,
            AbilityKey::Reform => 2,
            AbilityKey::Charge => 3,
            AbilityKey::Infest => 4,
            AbilityKey::Hire => 5,
            AbilityKey::Purge => 6,
        }
    }

    /// Base cooldown in frames, before tier reduction.
    #[must_use]
    pub fn base_cooldown(self) -> u32 {
        match self {
            AbilityKey::Possess => 300,
            AbilityKey::IceWall => 600,
            AbilityKey::Reform => 600,
            AbilityKey::Charge => 900,
            AbilityKey::Infest => 420,
            AbilityKey::Hire => 240,
            AbilityKey::Purge => 1200,
        }
    }
}

/// Static per-class data. Behavior lives in the world's ability dispatch;
/// this table only describes the loadout.
#[derive(Debug)]
pub struct ClassSpec {
    pub kind: ClassKind,
    pub color: [u8; 3],
    pub abilities: &'static [AbilityKey],
}

static NECROMANCER: ClassSpec = ClassSpec {
    kind: ClassKind::Necromancer,
    color: [120, 40, 160],
    abilities: &[AbilityKey::Possess],
};

static MAGE: ClassSpec = ClassSpec {
    kind: ClassKind::Mage,
    color: [80, 180, 255],
    abilities: &[AbilityKey::IceWall, AbilityKey::Reform],
};

static JUGGERNAUT: ClassSpec = ClassSpec {
    kind: ClassKind::Juggernaut,
    color: [200, 60, 40],
    abilities: &[AbilityKey::Charge],
};

static BROODMOTHER: ClassSpec = ClassSpec {
    kind: ClassKind::Broodmother,
    color: [60, 140, 50],
    abilities: &[AbilityKey::Infest],
};

static OVERSEER: ClassSpec = ClassSpec {
    kind: ClassKind::Overseer,
    color: [220, 170, 40],
    abilities: &[AbilityKey::Hire],
};

static PURIFIER: ClassSpec = ClassSpec {
    kind: ClassKind::Purifier,
    color: [240, 240, 240],
    abilities: &[AbilityKey::Purge],
};

/// Mutable per-player class progression.
#[derive(Debug, Clone)]
pub struct ClassState {
    cooldowns: [u32; AbilityKey::COUNT],
    tiers: [u8; AbilityKey::COUNT],
    /// Momentum accumulated by holding a straight course (Juggernaut).
    pub kinetic_buildup: f32,
    pub last_move_angle: f32,
    pub charging: bool,
    pub charge_frames_left: u32,
}

impl Default for ClassState {
    fn default() -> Self {
        Self {
            cooldowns: [0; AbilityKey::COUNT],
            tiers: [1; AbilityKey::COUNT],
            kinetic_buildup: 0.0,
            last_move_angle: 0.0,
            charging: false,
            charge_frames_left: 0,
        }
    }
}

impl ClassState {
    #[must_use]
    pub fn tier(&self, key: AbilityKey) -> u8 {
        self.tiers[key.index()]
    }

    #[must_use]
    pub fn cooldown_remaining(&self, key: AbilityKey) -> u32 {
        self.cooldowns[key.index()]
    }

    #[must_use]
    pub fn ready(&self, key: AbilityKey) -> bool {
        self.cooldowns[key.index()] == 0
    }

    /// Effective cooldown at the current tier: each tier past the first
    /// knocks off a tenth of the base, bottoming out at that tenth.
    #[must_use]
    pub fn effective_cooldown(&self, key: AbilityKey) -> u32 {
        let base = key.base_cooldown();
        let tier = u32::from(self.tiers[key.index()]);
        let step = base / 10;
        base.saturating_sub(step * tier.saturating_sub(1)).max(step)
    }

    /// Start the cooldown after a successful cast.
    pub fn trigger(&mut self, key: AbilityKey) {
        self.cooldowns[key.index()] = self.effective_cooldown(key);
    }

    pub fn tick(&mut self) {
        for cooldown in &mut self.cooldowns {
            *cooldown = cooldown.saturating_sub(1);
        }
    }

    /// Mass cost to buy the next tier, or `None` when already capped.
    #[must_use]
    pub fn upgrade_cost(&self, key: AbilityKey, config: &ArenaConfig) -> Option<f32> {
        let tier = self.tiers[key.index()];
        if tier >= config.ability_max_tier {
            return None;
        }
        Some(config.upgrade_cost_base * f32::from(tier + 1))
    }

    /// Raise the tier; the caller has already paid the mass cost.
    pub fn apply_upgrade(&mut self, key: AbilityKey, max_tier: u8) {
        let tier = &mut self.tiers[key.index()];
        if *tier < max_tier {
            *tier += 1;
        }
    }
}
