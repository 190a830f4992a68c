//! World State Server
//!
//! Loads the configured map from exported content, runs the world loop and
//! places a few demo players until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use world_state::{
    spawn_world, AssetParser, DataTableLoader, GameDataService, PlayerId, Vec3, World, WorldConfig, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = WorldConfig::from_env();
    info!("World State Server v{}", VERSION);
    info!(
        "Map: {}, game mode: {}, tick rate: {} Hz",
        config.map_id, config.game_mode, config.tick_rate
    );
    info!("Assets: {}/{}", config.assets_path.display(), config.content_domain);

    let parser = Arc::new(AssetParser::from_fs(&config.assets_path, &config.content_domain));
    let game_data = Arc::new(GameDataService::new(DataTableLoader::from_fs(
        &config.assets_path,
        &config.content_domain,
    )));

    // Corrupt tables abort startup; missing ones only degrade
    game_data
        .initialize()
        .await
        .context("Failed to load game data tables")?;
    game_data.log_configuration().await;

    if !game_data.is_game_mode_supported(&config.game_mode).await {
        warn!("Game mode {} has no tuning row", config.game_mode);
    }

    let mut world = World::new(config, parser, game_data);
    match world.load_level().await {
        Ok(summary) => info!(
            "Loaded {} with {} spawn candidates",
            summary.level_path, summary.total_candidates
        ),
        Err(e) => error!("Level load failed, players will use the fallback spawn: {}", e),
    }

    let (handle, task) = spawn_world(world);

    demo_players(&handle).await;

    info!("Running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    handle.shutdown();
    let world = task.await.context("World task failed")?;
    info!("Stopped with {} players after {} ticks", world.player_count(), world.tick_count());
    Ok(())
}

/// Join a few players and move each one step.
async fn demo_players(handle: &world_state::WorldHandle) {
    info!("=== Demo Players ===");

    for _ in 0..4 {
        let player_id = PlayerId::random();
        let joined = match handle.join(player_id).await {
            Ok(joined) => joined,
            Err(e) => {
                error!("Join failed: {}", e);
                continue;
            }
        };
        info!("Player {} spawned at {}", player_id, joined.position);

        let step = joined.position + Vec3::new(20.0, 0.0, 0.0);
        match handle
            .move_player(player_id, step, Vec3::new(200.0, 0.0, 0.0), 0.1)
            .await
        {
            Ok(outcome) => info!("Player {} move: {:?}", player_id, outcome),
            Err(e) => error!("Move failed: {}", e),
        }
    }

    match handle.players().await {
        Ok(players) => {
            for player in players {
                info!(
                    "  {} {} at {} ({} accepted, {} rejected)",
                    player.id, player.state, player.position, player.accepted_moves, player.rejected_moves
                );
            }
        }
        Err(e) => error!("Status query failed: {}", e),
    }
}
