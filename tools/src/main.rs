use std::path::{Path, PathBuf};

use character_collision::{CharacterController, ControllerProfile, ObstacleSet};
use character_sweep::{CollisionFlags, Extended, ExtendedPoint};
use clap::{Parser, Subcommand};
use physics_rapier::PhysicsWorld;
use rapier3d::math::{Real, Vector};
use test_map::TestMap;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_INVALID: i32 = 11;

const TICK_SECONDS: Real = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "tools", version, about = "Character sweep tools CLI")]
struct Cli {
    /// Log resolver exits and retries (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a controller profile and optionally a scene map.
    Check(CheckArgs),
    /// Replay a straight walk through a scene map.
    Walk(WalkArgs),
}

#[derive(Parser)]
struct CheckArgs {
    #[arg(long, value_name = "PATH")]
    profile: PathBuf,

    #[arg(long, value_name = "PATH")]
    map: Option<PathBuf>,
}

#[derive(Parser)]
struct WalkArgs {
    #[arg(long, value_name = "PATH")]
    map: PathBuf,

    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,

    /// Walk direction as `x,y,z`; flattened against up.
    #[arg(long, value_parser = parse_vector, allow_hyphen_values = true)]
    dir: Vector<Real>,

    /// Meters per second.
    #[arg(long, default_value_t = 3.0)]
    speed: Real,

    #[arg(long, default_value_t = 120)]
    ticks: u32,

    #[arg(long, default_value_t = 9.81)]
    gravity: Real,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let exit_code = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Walk(args) => run_walk(args),
    };
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn parse_vector(text: &str) -> Result<Vector<Real>, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z (got '{}')", text));
    }
    let mut vector = Vector::zeros();
    for (index, part) in parts.iter().enumerate() {
        vector[index] = part
            .parse::<Real>()
            .map_err(|err| format!("invalid component '{}': {}", part, err))?;
    }
    Ok(vector)
}

fn read_text(path: &Path) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|err| {
        eprintln!("failed to read {}: {}", path.display(), err);
        EXIT_USAGE
    })
}

fn load_profile(path: &Path) -> Result<ControllerProfile, i32> {
    let text = read_text(path)?;
    let profile = ControllerProfile::parse_toml(&text).map_err(|err| {
        eprintln!("profile parse failed: {}", err);
        EXIT_INVALID
    })?;
    let validation = profile.validate();
    for warning in &validation.warnings {
        eprintln!("profile warning: {}", warning);
    }
    if !validation.is_ok() {
        for error in &validation.errors {
            eprintln!("profile error: {}", error);
        }
        return Err(EXIT_INVALID);
    }
    Ok(profile)
}

fn load_map(path: &Path) -> Result<TestMap, i32> {
    let text = read_text(path)?;
    let map = TestMap::parse_toml(&text).map_err(|err| {
        eprintln!("map parse failed: {}", err);
        EXIT_INVALID
    })?;
    let validation = map.validate();
    for warning in &validation.warnings {
        eprintln!("map warning: {}", warning);
    }
    if !validation.is_ok() {
        for error in &validation.errors {
            eprintln!("map error: {}", error);
        }
        return Err(EXIT_INVALID);
    }
    Ok(map)
}

fn run_check(args: CheckArgs) -> i32 {
    let profile = match load_profile(&args.profile) {
        Ok(profile) => profile,
        Err(code) => return code,
    };
    if let Err(err) = profile.controller_config().validate() {
        eprintln!("profile error: {}", err);
        return EXIT_INVALID;
    }
    println!("profile ok: {}", args.profile.display());

    if let Some(path) = args.map {
        let map = match load_map(&path) {
            Ok(map) => map,
            Err(code) => return code,
        };
        match map.expanded_solids() {
            Ok(solids) => println!("map ok: {} ({} solids)", map.name, solids.len()),
            Err(err) => {
                eprintln!("map error: {}", err);
                return EXIT_INVALID;
            }
        }
    }
    EXIT_SUCCESS
}

fn run_walk(args: WalkArgs) -> i32 {
    let map = match load_map(&args.map) {
        Ok(map) => map,
        Err(code) => return code,
    };
    let profile = match args.profile.as_deref().map(load_profile) {
        Some(Ok(profile)) => profile,
        Some(Err(code)) => return code,
        None => ControllerProfile::arena_default(),
    };
    if !args.speed.is_finite() || !args.gravity.is_finite() {
        eprintln!("--speed and --gravity must be finite");
        return EXIT_USAGE;
    }

    let up = profile.up_direction().into_inner();
    let mut world = PhysicsWorld::new(-up * args.gravity);
    if let Err(err) = map.build_world(&mut world) {
        eprintln!("map error: {}", err);
        return EXIT_INVALID;
    }

    let spawn = map.spawn();
    let lift = Extended::from(profile.full_height() * 0.5 + profile.contact_offset);
    let center = ExtendedPoint::new(
        Extended::from(spawn[0]),
        Extended::from(spawn[1]),
        Extended::from(spawn[2]),
    ) + up.cast::<Extended>() * lift;
    let mut controller = CharacterController::new(&profile, center);
    let obstacles = ObstacleSet::new();

    let lateral = args.dir - up * args.dir.dot(&up);
    let walk = lateral.try_normalize(1.0e-6).unwrap_or_else(Vector::zeros) * args.speed;
    let mut fall_speed: Real = 0.0;
    info!(map = %map.name, ticks = args.ticks, "walk started");

    for tick in 0..args.ticks {
        fall_speed += args.gravity * TICK_SECONDS;
        let displacement = (walk - up * fall_speed) * TICK_SECONDS;
        let step = controller.move_character(&world, &obstacles, displacement, profile.min_distance);
        if step.flags.contains(CollisionFlags::DOWN) {
            fall_speed = 0.0;
        }
        println!(
            "tick {:>4} pos=({:.3}, {:.3}, {:.3}) flags={}{}{}",
            tick,
            step.position.x,
            step.position.y,
            step.position.z,
            step.flags,
            if step.hit_non_walkable { " non_walkable" } else { "" },
            if step.retried { " retried" } else { "" },
        );
        world.step(TICK_SECONDS);
    }
    EXIT_SUCCESS
}
