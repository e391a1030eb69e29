//! Drives a simulated rover from the terminal.
//!
//! Usage:
//!   roversim                             # empty world, commands from stdin
//!   roversim --world world.yaml          # obstacles and floor markings
//!   roversim --config rover.yaml         # per-unit calibration
//!   roversim --script wwaq               # run the given commands and exit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rovercore::{config::RoverConfig, hal::CommandSource, Rover, TABLE_CAPACITY};
use roversim::{
    source::{Console, Script, Terminal},
    Simulator, World,
};

#[derive(Parser)]
#[command(name = "roversim")]
#[command(about = "Serial command loop of the rover against a simulated world")]
struct Args {
    /// Rover configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// World description file (YAML)
    #[arg(long)]
    world: Option<PathBuf>,

    /// Command bytes to run instead of reading stdin
    #[arg(long)]
    script: Option<String>,
}

fn load<T: serde::de::DeserializeOwned + Default>(path: Option<&PathBuf>) -> Result<T> {
    let path = match path {
        Some(path) => path,
        None => return Ok(T::default()),
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn serve<S: CommandSource>(
    rover: &mut Rover<TABLE_CAPACITY>,
    sim: &mut Simulator,
    source: &mut S,
    done: impl Fn(&S) -> bool,
) {
    let mut console = Console;
    while !done(source) {
        match rover.serve_once(sim, source, &mut console) {
            Ok(Some(command)) => log::debug!("{:?} done", command),
            Ok(None) => {}
            Err(err) => log::error!("{}", err),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config: RoverConfig = load(args.config.as_ref())?;
    let world: World = load(args.world.as_ref())?;
    log::info!(
        "{} obstacles, {} floor zones",
        world.obstacles.len(),
        world.zones.len()
    );

    let mut sim = Simulator::builder()
        .world(world)
        .pose(config.motion.initial_pose)
        .build();
    let mut rover = Rover::<TABLE_CAPACITY>::new(config);

    match args.script {
        Some(script) => {
            let mut source = Script::new(script.as_bytes());
            serve(&mut rover, &mut sim, &mut source, Script::is_done);
        }
        None => {
            let mut source = Terminal::spawn();
            serve(&mut rover, &mut sim, &mut source, Terminal::is_done);
        }
    }
    Ok(())
}
