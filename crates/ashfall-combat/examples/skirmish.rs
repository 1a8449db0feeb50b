//! A scripted skirmish driven headless through the combat world.
//!
//! Steps the simulation at a fixed 16 ms per frame, plays a minimal
//! movement layer (walking enemies by their requested direction), and
//! prints every combat event. Run with:
//!
//! ```text
//! RUST_LOG=ashfall_combat=debug cargo run --example skirmish
//! ```

use anyhow::Result;
use glam::Vec2;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ashfall_common::{Clock, ManualClock, Rect};
use ashfall_combat::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("ashfall_combat=info".parse()?))
        .init();

    let config = CombatConfig::default();
    let mut world = CombatWorld::new(config, Rect::from_topleft(400.0, 0.0, 45.0, 93.0))
        .with_spawner(EnemySpawner::with_seed(7));
    let clock = ManualClock::new();

    world.spawn_enemy(EnemyKind::Sceleton, 1, Vec2::new(560.0, 0.0), clock.now_ms());
    world.spawn_enemy(EnemyKind::Ninja, 1, Vec2::new(700.0, 7.5), clock.now_ms());
    world.spawn_enemy(EnemyKind::Wizard, 2, Vec2::new(900.0, 7.5), clock.now_ms());

    // Sixty simulated seconds at ~60 fps, or until the fight decides
    for frame in 0..3750u32 {
        if frame % 20 == 0 {
            let _ = world.handle_command(PlayerCommand::SwingSword, &clock);
        }

        world.tick(&clock, &Unequipped);

        // Walk enemies by the direction the AI requested
        let moves: Vec<_> = world
            .enemies()
            .iter()
            .filter(|enemy| !enemy.is_dead())
            .map(|enemy| {
                (
                    enemy.id(),
                    enemy.rect.translated(Vec2::new(enemy.direction_x, 0.0)),
                )
            })
            .collect();
        for (id, rect) in moves {
            world.sync_enemy_rect(id, rect);
        }

        for event in world.events().drain() {
            info!(?event, "combat event");
        }
        if world.is_game_over() {
            break;
        }
        clock.advance(16);
    }

    info!(
        enemies_left = world.enemies().len(),
        player_health = world.player().health.current(),
        "skirmish over"
    );
    Ok(())
}
