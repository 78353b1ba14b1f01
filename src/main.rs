//! Boardsim command-line driver.
//!
//! Runs a headless simulation for a fixed number of ticks and logs every
//! effect command the engine emits, the way a renderer would consume them.
//!
//! Without `--templates` a built-in demo scene is loaded (see `demo.rs`).
//! With it, objects are placed with `--spawn` and scripted with `--script`.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --ticks 200
//! cargo run --release -- --templates board.json --script car=car.lua --spawn car=0,3
//! RUST_LOG=boardsim=debug cargo run
//! ```

mod demo;

use std::path::PathBuf;

use boardsim::{EffectCmd, PieceColor, SimConfig, Simulation, TemplateStore};
use clap::Parser;
use log::info;

/// Headless board simulation driver.
#[derive(Parser)]
#[command(version, about = "Runs a board simulation and logs the effects it emits.")]
struct Cli {
    /// INI configuration file. Defaults are used for anything it omits.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective configuration to PATH and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// JSON file with object templates. Without it the demo scene runs.
    #[arg(long, value_name = "PATH")]
    templates: Option<PathBuf>,

    /// Lua behavior for a template, as TEMPLATE=PATH. Repeatable.
    #[arg(long = "script", value_name = "TEMPLATE=PATH", value_parser = parse_script)]
    scripts: Vec<(String, PathBuf)>,

    /// Object to place, as TEMPLATE=X,Y or TEMPLATE=X,Y,COLOR. Repeatable.
    #[arg(long = "spawn", value_name = "TEMPLATE=X,Y[,COLOR]", value_parser = parse_spawn)]
    spawns: Vec<SpawnArg>,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 100)]
    ticks: u32,

    /// Seconds per tick. Defaults to `tick_seconds` from the configuration.
    #[arg(long)]
    dt: Option<f32>,
}

#[derive(Debug, Clone)]
struct SpawnArg {
    template: String,
    at: (i32, i32),
    color: Option<PieceColor>,
}

fn parse_script(arg: &str) -> Result<(String, PathBuf), String> {
    let (template, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TEMPLATE=PATH, got '{arg}'"))?;
    Ok((template.to_string(), PathBuf::from(path)))
}

fn parse_spawn(arg: &str) -> Result<SpawnArg, String> {
    let (template, rest) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TEMPLATE=X,Y, got '{arg}'"))?;
    let mut parts = rest.split(',').map(str::trim);
    let mut coord = |axis: &str| -> Result<i32, String> {
        parts
            .next()
            .ok_or_else(|| format!("missing {axis} in '{arg}'"))?
            .parse()
            .map_err(|e| format!("bad {axis} in '{arg}': {e}"))
    };
    let x = coord("x")?;
    let y = coord("y")?;
    let color = parts.next().map(str::parse::<PieceColor>).transpose()?;
    Ok(SpawnArg {
        template: template.to_string(),
        at: (x, y),
        color,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = SimConfig::with_path(path);
            if let Err(e) = config.load_from_file() {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            config
        }
        None => SimConfig::new(),
    };

    // Early-exit: dump the configuration and quit
    if let Some(path) = cli.write_config {
        config.config_path = path;
        if let Err(e) = config.save_to_file() {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        println!("Configuration written to {}", config.config_path.display());
        return;
    }

    let templates = match &cli.templates {
        Some(path) => match TemplateStore::from_json_file(path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        None => demo::templates(),
    };

    let dt = cli.dt.unwrap_or(config.tick_seconds);
    let mut sim = Simulation::new(config, templates);

    let use_demo = cli.templates.is_none();
    if use_demo {
        demo::register_behaviors(&mut sim);
    }
    // scripts replace the demo behaviors of their templates
    for (template, path) in &cli.scripts {
        register_script(&mut sim, template, path);
    }

    if use_demo {
        demo::populate(&mut sim);
    }
    for spawn in &cli.spawns {
        match sim.spawn(&spawn.template, spawn.at, spawn.color) {
            Ok(id) => info!("spawned {} as object {}", spawn.template, id),
            Err(e) => log::warn!("cannot spawn {} at {:?}: {}", spawn.template, spawn.at, e),
        }
    }
    report_effects(&mut sim);

    info!("running {} ticks of {}s", cli.ticks, dt);
    for _ in 0..cli.ticks {
        sim.tick(dt);
        report_effects(&mut sim);
    }

    info!(
        "done after {:.2}s simulated: {} objects left",
        sim.now(),
        sim.object_count()
    );
    for object in sim.objects(|_| true) {
        info!(
            "  {} {} at {} ({})",
            object.id, object.template, object.position, object.animation
        );
    }
}

#[cfg(feature = "lua")]
fn register_script(sim: &mut Simulation, template: &str, path: &std::path::Path) {
    if let Err(e) = sim.register_lua_script(template, path) {
        eprintln!("Error loading script {}: {e}", path.display());
        std::process::exit(1);
    }
    info!("{} scripted by {}", template, path.display());
}

#[cfg(not(feature = "lua"))]
fn register_script(_sim: &mut Simulation, template: &str, path: &std::path::Path) {
    log::warn!(
        "ignoring script {} for {}: built without Lua support",
        path.display(),
        template
    );
}

fn report_effects(sim: &mut Simulation) {
    let now = sim.now();
    for effect in sim.drain_effects() {
        match effect {
            EffectCmd::ShowMessage { text, duration } => {
                info!("[{:7.2}] message '{}' ({:?}s)", now, text, duration)
            }
            other => info!("[{:7.2}] {:?}", now, other),
        }
    }
}
