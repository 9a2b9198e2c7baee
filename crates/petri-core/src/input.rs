//! Per-tick input intents handed to the simulation by the host layer.
//!
//! The core never reads devices: the host samples its event sources and
//! hands over one plain-value frame per tick. Edge-triggered intents are
//! `true` for exactly the tick they fired on.

use crate::classes::{AbilityKey, ClassKind};
use crate::geom::Vec2;

#[derive(Debug, Clone)]
pub struct InputFrame {
    /// Cursor position in screen coordinates; the world unprojects it
    /// through the camera when resolving movement and ability targets.
    pub cursor: Vec2,
    /// Edge: split every eligible cell toward the cursor.
    pub split: bool,
    /// Level: eject mass while held (rate-limited by the eject cooldown).
    pub eject: bool,
    /// Edge: attempt to fire a class ability.
    pub ability: Option<AbilityKey>,
    /// Edge: pick a class once the picker has unlocked.
    pub select_class: Option<ClassKind>,
    /// Edge: spend mass to raise an ability tier.
    pub upgrade: Option<AbilityKey>,
    /// Edge: respawn after death.
    pub respawn: bool,
    /// Level: double bot spawning and top up extra food while held.
    pub spawn_boost: bool,
    /// Edge: toggle the mass feeder cheat.
    pub toggle_feeder: bool,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self {
            cursor: Vec2::ZERO,
            split: false,
            eject: false,
            ability: None,
            select_class: None,
            upgrade: None,
            respawn: false,
            spawn_boost: false,
            toggle_feeder: false,
        }
    }
}

impl InputFrame {
    /// An idle frame with the cursor parked at a screen position.
    #[must_use]
    pub fn at_cursor(cursor: Vec2) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }
}
