use tracing::info;

use crate::entity::{Character, EntityHandle, EntityStore, Monster, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemId {
    Monster,
    Character,
    Player,
}

impl SystemId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Monster => "Monster",
            Self::Character => "Character",
            Self::Player => "Player",
        }
    }
}

pub const SYSTEM_ORDER: [SystemId; 3] = [SystemId::Monster, SystemId::Character, SystemId::Player];

pub(crate) struct SystemContext<'a> {
    pub(crate) dt_seconds: f32,
    pub(crate) elapsed_seconds: f64,
    pub(crate) keep_alive_timeout_seconds: f64,
    pub(crate) store: &'a mut EntityStore,
    pub(crate) removals: &'a mut Vec<EntityHandle>,
    pub(crate) monster_count: &'a mut usize,
}

/// Runs every system once per tick in [`SYSTEM_ORDER`]. Systems never destroy
/// entities themselves; they queue handles in `removals` for the world.
#[derive(Debug, Default)]
pub(crate) struct SystemsPipeline {
    last_tick_order: Vec<SystemId>,
}

impl SystemsPipeline {
    pub(crate) fn run_once_per_tick(&mut self, context: &mut SystemContext<'_>) {
        self.last_tick_order.clear();
        for system_id in SYSTEM_ORDER {
            self.last_tick_order.push(system_id);
            self.run_system(system_id, context);
        }
    }

    pub(crate) fn last_tick_order(&self) -> &[SystemId] {
        &self.last_tick_order
    }

    fn run_system(&self, system_id: SystemId, context: &mut SystemContext<'_>) {
        match system_id {
            SystemId::Monster => Self::run_monster_system(context),
            SystemId::Character => Self::run_character_system(context),
            SystemId::Player => Self::run_player_system(context),
        }
    }

    fn run_monster_system(context: &mut SystemContext<'_>) {
        let store = &*context.store;
        *context.monster_count = store
            .iter::<Monster>()
            .filter(|(handle, _)| {
                store
                    .get::<Character>(*handle)
                    .is_some_and(|character| character.is_active)
            })
            .count();
    }

    fn run_character_system(context: &mut SystemContext<'_>) {
        let dt = context.dt_seconds;
        context
            .store
            .for_each_mut::<Character>(|_, character| {
                if !character.is_active || character.move_cooldown <= 0.0 {
                    return;
                }
                character.move_cooldown = (character.move_cooldown - dt).max(0.0);
            });
    }

    fn run_player_system(context: &mut SystemContext<'_>) {
        let now = context.elapsed_seconds;
        let timeout = context.keep_alive_timeout_seconds;
        for (handle, player) in context.store.iter::<Player>() {
            let idle_seconds = now - player.connection.last_keep_alive();
            if idle_seconds > timeout {
                info!(
                    entity = %handle,
                    connection = player.connection.id().0,
                    idle_seconds,
                    "player_keep_alive_timeout"
                );
                context.removals.push(handle);
            }
        }
    }
}
