//! Per-mode setup and teardown.
//!
//! Each [`ParkourMode`] variant knows what it does to a player on entering
//! a course, after a respawn, and on leaving. The engine calls these hooks
//! at the same three points for every course and never branches on the
//! mode itself.

use parkforge_course::{Course, ParkourMode, PlayerId};

use crate::{Channel, Host, ModesConfig, Notice, ParkourTool};

/// Food level that stops sprinting.
const NO_RUN_FOOD_LEVEL: u32 = 6;

pub trait ModeHooks {
    /// Applied once when the player joins (not on soft restart).
    fn on_enter<H: Host>(&self, player: PlayerId, course: &Course, modes: &ModesConfig, host: &mut H);

    /// Re-applied after a death.
    fn on_respawn<H: Host>(&self, player: PlayerId, course: &Course, host: &mut H);

    /// Undoes `on_enter` on leave or finish.
    fn on_exit<H: Host>(&self, player: PlayerId, modes: &ModesConfig, host: &mut H);

    /// Whether the food level set on join should be left to the mode.
    fn controls_food(&self) -> bool;
}

impl ModeHooks for ParkourMode {
    fn on_enter<H: Host>(&self, player: PlayerId, course: &Course, modes: &ModesConfig, host: &mut H) {
        match self {
            Self::None => {}
            Self::Freedom => {
                host.notify(player, Channel::Chat, Notice::FreedomJoin);
                host.give_tool(player, ParkourTool::Freedom);
            }
            Self::Speedy => host.set_walk_speed(player, modes.speedy_speed),
            Self::Rockets => {
                host.notify(player, Channel::Chat, Notice::RocketsJoin);
                host.give_tool(player, ParkourTool::Rockets);
            }
            Self::Potion => {
                host.apply_effects(player, &course.settings.potion_effects);
                if let Some(text) = &course.settings.potion_join_message {
                    host.notify(player, Channel::Chat, Notice::PotionJoin(text.clone()));
                }
            }
            Self::NoRun => host.set_food_level(player, NO_RUN_FOOD_LEVEL),
        }
        tracing::trace!(%player, mode = %self, "mode applied");
    }

    fn on_respawn<H: Host>(&self, player: PlayerId, course: &Course, host: &mut H) {
        if let Self::Potion = self {
            host.apply_effects(player, &course.settings.potion_effects);
        }
    }

    fn on_exit<H: Host>(&self, player: PlayerId, modes: &ModesConfig, host: &mut H) {
        if let Self::Speedy = self {
            host.set_walk_speed(player, modes.speedy_reset_speed);
        }
    }

    fn controls_food(&self) -> bool {
        matches!(self, Self::NoRun)
    }
}
