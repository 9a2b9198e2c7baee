//! The infestation web: bolts, tendrils, creep, and the painted layer.
//!
//! Infection spreads as a graph over the free bot population. Each infected
//! host grows one tendril that hunts the nearest uninfected bot in reach;
//! on contact the victim joins the web and sprouts a tendril of its own,
//! up to a tier-scaled member cap. Hosts accrue a creep radius every frame;
//! a fully grown blot is baked into a permanent paint layer, while a host
//! that dies early takes its unfinished creep with it.

use crate::BotId;
use crate::body::Body;
use crate::bots::Bot;
use crate::config::ArenaConfig;
use crate::geom::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

/// Per-host infection progress.
#[derive(Debug, Clone, Copy)]
pub struct Infection {
    pub creep_radius: f32,
    pub painted: bool,
}

/// A growing strand reaching out from an infected host.
#[derive(Debug, Clone)]
pub struct Tendril {
    pub host: BotId,
    pub tip: Vec2,
    pub target: Option<BotId>,
    /// Drives the idle free-wave motion while searching.
    pub sway_phase: f32,
}

/// A web projectile in flight.
#[derive(Debug, Clone)]
pub struct InfestBolt {
    pub body: Body,
    pub ttl: u32,
}

impl InfestBolt {
    #[must_use]
    pub fn new(origin: Vec2, direction: Vec2, config: &ArenaConfig) -> Self {
        let mut body = Body::new(origin, 4.0, [150, 230, 150]);
        body.velocity = direction.normalized() * config.infest_bolt_speed;
        Self {
            body,
            ttl: config.infest_bolt_ttl,
        }
    }

    /// Straight-line flight; bolts ignore friction and walls.
    pub fn advance(&mut self, config: &ArenaConfig) {
        self.body.position += self.body.velocity;
        self.body.position.x = self.body.position.x.clamp(0.0, config.world_width);
        self.body.position.y = self.body.position.y.clamp(0.0, config.world_height);
        self.ttl = self.ttl.saturating_sub(1);
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.ttl == 0
    }
}

/// A finished creep blot, permanent once painted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreepBlot {
    pub position: Vec2,
    pub radius: f32,
}

/// All web state owned by the world.
#[derive(Debug, Clone, Default)]
pub struct WebState {
    infections: SecondaryMap<BotId, Infection>,
    tendrils: Vec<Tendril>,
    pub bolts: Vec<InfestBolt>,
    blots: Vec<CreepBlot>,
}

impl WebState {
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.infections.len()
    }

    #[must_use]
    pub fn is_infected(&self, bot: BotId) -> bool {
        self.infections.contains_key(bot)
    }

    #[must_use]
    pub fn painted_blots(&self) -> &[CreepBlot] {
        &self.blots
    }

    #[must_use]
    pub fn member_cap(&self, config: &ArenaConfig, tier: u8) -> usize {
        config.web_member_base + config.web_member_per_tier * usize::from(tier)
    }

    /// Add a host to the web and sprout its tendril. No-op when the host
    /// is already infected or the member cap is reached.
    pub fn infect(&mut self, host: BotId, position: Vec2, config: &ArenaConfig, tier: u8) -> bool {
        if self.infections.contains_key(host)
            || self.member_count() >= self.member_cap(config, tier)
        {
            return false;
        }
        self.infections.insert(
            host,
            Infection {
                creep_radius: 0.0,
                painted: false,
            },
        );
        self.tendrils.push(Tendril {
            host,
            tip: position,
            target: None,
            sway_phase: 0.0,
        });
        true
    }

    /// One frame of web growth: creep accrual, tendril extension, and
    /// attachment. Newly attached bots are slowed.
    pub fn step(&mut self, bots: &mut SlotMap<BotId, Bot>, config: &ArenaConfig, tier: u8) {
        // Creep accrues on living hosts; a maxed blot is painted exactly once.
        for (host, infection) in &mut self.infections {
            let Some(bot) = bots.get(host) else { continue };
            if infection.painted {
                continue;
            }
            infection.creep_radius =
                (infection.creep_radius + config.creep_growth).min(config.creep_max);
            if infection.creep_radius >= config.creep_max {
                infection.painted = true;
                self.blots.push(CreepBlot {
                    position: bot.body.position,
                    radius: config.creep_max,
                });
            }
        }

        let cap = self.member_cap(config, tier);
        let mut attached: Vec<BotId> = Vec::new();
        let mut newly_infected: Vec<(BotId, Vec2)> = Vec::new();
        self.tendrils.retain_mut(|tendril| {
            let Some(host) = bots.get(tendril.host) else {
                return false;
            };
            let host_position = host.body.position;

            // Revalidate the lock: a dead or already-infected target is dropped.
            if let Some(target) = tendril.target {
                let stale = !bots.contains_key(target) || self.infections.contains_key(target);
                if stale {
                    tendril.target = None;
                }
            }

            if tendril.target.is_none() && self.infections.len() + newly_infected.len() < cap {
                let mut best: Option<(BotId, f32)> = None;
                for (candidate, bot) in bots.iter() {
                    if self.infections.contains_key(candidate)
                        || newly_infected.iter().any(|(id, _)| *id == candidate)
                    {
                        continue;
                    }
                    let dist = host_position.distance(bot.body.position);
                    if dist < config.web_reach
                        && best.is_none_or(|(_, best_dist)| dist < best_dist)
                    {
                        best = Some((candidate, dist));
                    }
                }
                tendril.target = best.map(|(id, _)| id);
            }

            match tendril.target {
                Some(target) => {
                    let Some(victim) = bots.get(target) else {
                        return true;
                    };
                    let to_victim = victim.body.position - tendril.tip;
                    if to_victim.length() <= config.web_step + victim.body.radius() {
                        newly_infected.push((target, victim.body.position));
                        attached.push(target);
                        return false;
                    }
                    tendril.tip += to_victim.normalized() * config.web_step;
                    true
                }
                None => {
                    // Free-wave around the host while searching.
                    tendril.sway_phase += 0.05;
                    let sway = Vec2::new(
                        tendril.sway_phase.cos(),
                        (tendril.sway_phase * 1.3).sin(),
                    );
                    tendril.tip = host_position + sway * (config.web_reach * 0.4);
                    true
                }
            }
        });

        for (victim, position) in newly_infected {
            self.infect(victim, position, config, tier);
        }
        for victim in attached {
            if let Some(bot) = bots.get_mut(victim) {
                bot.body.slow_timer = config.web_slow_frames;
            }
        }
    }

    /// Drop state whose host is gone. Painted blots persist; unfinished
    /// creep is erased with the host.
    pub fn purge_dead(&mut self, bots: &SlotMap<BotId, Bot>) {
        self.infections.retain(|host, _| bots.contains_key(host));
        self.tendrils.retain(|tendril| bots.contains_key(tendril.host));
    }

    pub fn clear(&mut self) {
        self.infections.clear();
        self.tendrils.clear();
        self.bolts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::Personality;

    fn spawn_bot(bots: &mut SlotMap<BotId, Bot>, position: Vec2) -> BotId {
        bots.insert(Bot::new(
            position,
            15.0,
            [50, 50, 50],
            "bot".into(),
            Personality::Timid,
        ))
    }

    #[test]
    fn tendril_reaches_and_infects_the_nearest_bot() {
        let config = ArenaConfig::default();
        let mut bots: SlotMap<BotId, Bot> = SlotMap::with_key();
        let host = spawn_bot(&mut bots, Vec2::new(1_000.0, 1_000.0));
        let near = spawn_bot(&mut bots, Vec2::new(1_100.0, 1_000.0));
        let far = spawn_bot(&mut bots, Vec2::new(1_300.0, 1_000.0));

        let mut web = WebState::default();
        assert!(web.infect(host, Vec2::new(1_000.0, 1_000.0), &config, 1));

        // ~100 units at 6/frame needs under 20 frames.
        for _ in 0..25 {
            web.step(&mut bots, &config, 1);
        }
        assert!(web.is_infected(near));
        assert!(!web.is_infected(far));
        assert_eq!(
            bots[near].body.slow_timer,
            config.web_slow_frames,
            "fresh members are slowed"
        );
    }

    #[test]
    fn member_cap_limits_spread() {
        let mut config = ArenaConfig::default();
        config.web_member_base = 2;
        config.web_member_per_tier = 0;
        let mut bots: SlotMap<BotId, Bot> = SlotMap::with_key();
        let host = spawn_bot(&mut bots, Vec2::new(1_000.0, 1_000.0));
        for i in 0..4 {
            spawn_bot(&mut bots, Vec2::new(1_050.0 + 30.0 * i as f32, 1_000.0));
        }

        let mut web = WebState::default();
        assert!(web.infect(host, Vec2::new(1_000.0, 1_000.0), &config, 1));
        for _ in 0..200 {
            web.step(&mut bots, &config, 1);
        }
        assert_eq!(web.member_count(), 2);
    }

    #[test]
    fn creep_paints_once_and_survives_host_death() {
        let mut config = ArenaConfig::default();
        config.creep_growth = config.creep_max; // paint on the first frame
        let mut bots: SlotMap<BotId, Bot> = SlotMap::with_key();
        let host = spawn_bot(&mut bots, Vec2::new(500.0, 500.0));

        let mut web = WebState::default();
        web.infect(host, Vec2::new(500.0, 500.0), &config, 1);
        web.step(&mut bots, &config, 1);
        web.step(&mut bots, &config, 1);
        assert_eq!(web.painted_blots().len(), 1);

        bots.remove(host);
        web.purge_dead(&bots);
        assert_eq!(web.painted_blots().len(), 1);
        assert_eq!(web.member_count(), 0);
    }

    #[test]
    fn unpainted_creep_dies_with_its_host() {
        let config = ArenaConfig::default();
        let mut bots: SlotMap<BotId, Bot> = SlotMap::with_key();
        let host = spawn_bot(&mut bots, Vec2::new(500.0, 500.0));

        let mut web = WebState::default();
        web.infect(host, Vec2::new(500.0, 500.0), &config, 1);
        web.step(&mut bots, &config, 1);

        bots.remove(host);
        web.purge_dead(&bots);
        assert!(web.painted_blots().is_empty());
        assert_eq!(web.member_count(), 0);
    }

    #[test]
    fn bolt_flies_straight_and_expires() {
        let config = ArenaConfig::default();
        let mut bolt = InfestBolt::new(
            Vec2::new(100.0, 100.0),
            Vec2::new(1.0, 0.0),
            &config,
        );
        for _ in 0..10 {
            bolt.advance(&config);
        }
        assert!((bolt.body.position.x - (100.0 + 10.0 * config.infest_bolt_speed)).abs() < 1e-3);
        for _ in 0..config.infest_bolt_ttl {
            bolt.advance(&config);
        }
        assert!(bolt.expired());
    }
}
