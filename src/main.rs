//! Runs a TrafCOD program without a traffic simulation.
//!
//! Vehicles arrive at every configured detector at random, with exponentially
//! distributed headways, and occupy the detector for a fixed time. Light
//! changes are printed as they happen.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use std::path::PathBuf;
use trafcod::{Controller, ControllerConfig, Event};

#[derive(Parser)]
#[command(name = "trafcod", about = "Run a TrafCOD program with random detector input")]
struct Cli {
    /// The TrafCOD program
    program: PathBuf,

    /// Controller settings as JSON; defaults to a controller named TLC
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated duration in s
    #[arg(long, default_value = "300")]
    duration: f64,

    /// Mean vehicle arrivals per detector per minute
    #[arg(long, default_value = "6")]
    arrivals: f64,

    /// Time a passing vehicle occupies a detector in s
    #[arg(long, default_value = "0.5")]
    occupancy: f64,

    /// Seed for the arrival process
    #[arg(long, default_value = "0")]
    seed: u64,
}

/// The arrival process at one detector.
struct Detector {
    name: String,
    next_arrival: f64,
    release: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.program)
        .with_context(|| format!("Failed to read {}", cli.program.display()))?;
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<ControllerConfig>(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => ControllerConfig::default(),
    };

    let mut controller = Controller::load(&config, &text)
        .with_context(|| format!("Failed to load {}", cli.program.display()))?;
    print_events(0.0, controller.take_events());

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let headway = Exp::new(cli.arrivals / 60.0).context("Arrival rate must be positive")?;
    let mut detectors = config
        .detectors
        .iter()
        .map(|name| Detector {
            name: name.clone(),
            next_arrival: headway.sample(&mut rng),
            release: None,
        })
        .collect::<Vec<_>>();

    let ticks = (cli.duration / config.tick_interval).ceil() as u64;
    let mut oscillations = 0;
    for tick in 1..=ticks {
        let time = tick as f64 * config.tick_interval;
        for detector in &mut detectors {
            if detector.release.map_or(false, |release| time >= release) {
                controller.on_detector(&detector.name, false)?;
                detector.release = None;
            }
            if time >= detector.next_arrival {
                controller.on_detector(&detector.name, true)?;
                detector.release = Some(time + cli.occupancy);
                detector.next_arrival = time + headway.sample(&mut rng);
            }
        }

        let report = controller.tick(time)?;
        if report.oscillation_detected {
            oscillations += 1;
        }
        print_events(time, controller.take_events());
    }

    println!(
        "Simulated {:.1}s in {} ticks; {} ticks did not converge",
        cli.duration, ticks, oscillations
    );
    Ok(())
}

fn print_events(time: f64, events: Vec<Event>) {
    for event in events {
        match event {
            Event::LightChanged {
                source, light, color, ..
            } => println!("{:8.1}s  {} -> {} ({})", time, light, color, source),
            Event::ConflictGroupChanged { from, to, .. } => {
                println!("{:8.1}s  conflict group [{}] -> [{}]", time, from, to)
            }
            Event::VariableTraced { .. } | Event::Warning { .. } => {}
        }
    }
}
