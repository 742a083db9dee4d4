mod ai;
mod camera;
mod components;
mod config;
mod entities;
mod events;
mod game_runtime;
mod input;
mod interaction;
mod map;
mod particles;
mod physics;
mod projectiles;
mod render;
mod simulation;
mod sprites;
mod tile_query;
mod world_text;

use std::sync::Arc;

use bevy::prelude::*;
use config::{load_play_config, PlayConfig};
use game_runtime::MapSource;
use map::GameMap;
use simulation::{run_scripted, ScriptedRun};

/// Map baked in at build time from `TILEPLAY_EMBED_MAP_PATH`; empty when unset.
const EMBEDDED_MAP: &str = include_str!(concat!(env!("OUT_DIR"), "/tileplay_embedded_map.json"));

#[derive(Default, Debug, PartialEq)]
struct CliArgs {
    headless: bool,
    script: Option<String>,
    map_path: Option<String>,
}

fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--headless" => cli.headless = true,
            "--script" => cli.script = iter.next().cloned(),
            other if other.starts_with("--") => eprintln!("[Tileplay] Ignoring unknown flag {other}"),
            other => {
                if cli.map_path.is_none() {
                    cli.map_path = Some(other.to_string());
                }
            }
        }
    }
    cli
}

/// CLI path, then `$TILEPLAY_MAP`, then the embedded map, then the demo level.
fn load_map(cli_path: Option<&str>) -> Result<(GameMap, String), String> {
    let path = cli_path.map(str::to_string).or_else(|| {
        std::env::var("TILEPLAY_MAP")
            .ok()
            .filter(|s| !s.is_empty())
    });
    if let Some(path) = path {
        return GameMap::load(&path).map(|map| (map, path));
    }
    if !EMBEDDED_MAP.trim().is_empty() {
        return GameMap::from_json(EMBEDDED_MAP).map(|map| (map, "embedded map".to_string()));
    }
    Ok((GameMap::demo(), "demo level".to_string()))
}

fn run_script(path: &str, map: Arc<GameMap>, config: PlayConfig) -> i32 {
    let script = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {path}: {e}"))
        .and_then(|json| ScriptedRun::from_json(&json));
    let script = match script {
        Ok(script) => script,
        Err(e) => {
            eprintln!("[Tileplay] {e}");
            return 2;
        }
    };
    let report = run_scripted(map, config, &script);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("[Tileplay] Failed to serialize report: {e}");
            1
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args);
    let config = load_play_config();
    let (map, source) = match load_map(cli.map_path.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("[Tileplay] {e}; falling back to the demo level");
            (GameMap::demo(), "demo level".to_string())
        }
    };
    let map = Arc::new(map);

    // Reports go to stdout, so scripted runs keep diagnostics on stderr.
    if let Some(script) = cli.script.as_deref() {
        eprintln!("[Tileplay] Scripted run of {} on {}", script, source);
        std::process::exit(run_script(script, map, config));
    }

    println!("[Tileplay] Playing {}", source);
    let mut app = App::new();

    if cli.headless {
        app.add_plugins(MinimalPlugins);
        println!("[Tileplay] Starting in HEADLESS mode");
    } else {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: config.window_title.clone(),
                resolution: (config.viewport.width, config.viewport.height).into(),
                resizable: false,
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        app.add_plugins(sprites::CanvasPlugin);
        println!("[Tileplay] Starting in WINDOWED mode");
    }

    app.insert_resource(config)
        .insert_resource(MapSource(map))
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .add_plugins(input::InputPlugin)
        .add_plugins(game_runtime::RuntimePlugin);

    app.run();
}
