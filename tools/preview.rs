/// Preview: interactive shell for rendering report formats.
///
/// Usage: preview [--snapshot <path>] [--disk <n>] [--seed <n>] [--format <fmt>]
///
/// Commands:
///   fmt <format>      parse a format and render it against the snapshot
///   render            render the current format again
///   load <path>       load a snapshot from a RON file
///   disk <n>          generate an eccentric disk of n stars
///   seed <n>          set RNG seed for generated disks
///   primary <id>      measure orbits against particle <id> ('none' for the barycenter)
///   particles         list particles
///   tags              list value tokens
///   help              list commands
///   quit              exit

use orbit_report::core::ast::Template;
use orbit_report::schema::particle::ParticleId;
use orbit_report::schema::snapshot::{Snapshot, SimulationState};
use orbit_report::schema::tag::{ParticleTag, SimTag};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_FORMAT: &str = "#st, #sc: {#pa,#pe;} #sG, #ajv, #djv, {#pj,}";
const DEFAULT_DISK: usize = 25;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut snapshot_path = None;
    let mut disk_size = DEFAULT_DISK;
    let mut seed: u64 = 42;
    let mut format = DEFAULT_FORMAT.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--snapshot" if i + 1 < args.len() => {
                i += 1;
                snapshot_path = Some(args[i].clone());
            }
            "--disk" if i + 1 < args.len() => {
                i += 1;
                disk_size = args[i].parse().unwrap_or(DEFAULT_DISK);
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--format" if i + 1 < args.len() => {
                i += 1;
                format = args[i].clone();
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut state = match snapshot_path {
        Some(ref path) => match SimulationState::load_from_ron(Path::new(path)) {
            Ok(state) => {
                println!("Loaded snapshot: {}", path);
                state
            }
            Err(e) => {
                eprintln!("ERROR loading snapshot {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => generate_disk(seed, disk_size),
    };
    let mut current_seed = seed;

    println!(
        "Snapshot '{}': {} particles at t={}",
        state.name,
        state.particle_count(),
        state.time
    );
    println!("Type 'help' for commands.\n");

    render(&format, &state);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }

        let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest),
            None => (trimmed.to_lowercase(), ""),
        };
        let arg = rest.trim();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "fmt" => {
                if rest.is_empty() {
                    println!("Current format: {}", format);
                    continue;
                }
                // Formats may start or end with separators, so keep `rest` untrimmed.
                format = rest.to_string();
                render(&format, &state);
            }
            "render" | "r" => {
                render(&format, &state);
            }
            "load" => {
                if arg.is_empty() {
                    println!("Usage: load <path>");
                    continue;
                }
                match SimulationState::load_from_ron(Path::new(arg)) {
                    Ok(loaded) => {
                        state = loaded;
                        println!(
                            "Loaded '{}': {} particles at t={}",
                            state.name,
                            state.particle_count(),
                            state.time
                        );
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "disk" => {
                let count = if arg.is_empty() {
                    DEFAULT_DISK
                } else {
                    match arg.parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => {
                            println!("Invalid star count: {}", arg);
                            continue;
                        }
                    }
                };
                state = generate_disk(current_seed, count);
                println!("Generated disk of {} stars (seed {})", count, current_seed);
            }
            "seed" => {
                if arg.is_empty() {
                    println!("Current seed: {}", current_seed);
                    continue;
                }
                match arg.parse::<u64>() {
                    Ok(s) => {
                        current_seed = s;
                        println!("Seed set to {}", current_seed);
                    }
                    Err(_) => println!("Invalid seed: {}", arg),
                }
            }
            "primary" => {
                if arg.is_empty() || arg == "none" {
                    state.primary = None;
                    println!("Orbits measured against the barycenter.");
                    continue;
                }
                let id = match arg.parse::<u32>() {
                    Ok(id) => ParticleId(id),
                    Err(_) => {
                        println!("Invalid particle id: {}", arg);
                        continue;
                    }
                };
                match state.index_of(id) {
                    Some(index) => {
                        state.primary = Some(id);
                        println!(
                            "Orbits measured against '{}' (id={})",
                            state.particles[index].name, id.0
                        );
                    }
                    None => println!("No particle with id {}", id.0),
                }
            }
            "particles" | "ls" => {
                print_particles(&state);
            }
            "tags" => {
                print_tags();
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
            }
        }
    }
}

fn generate_disk(seed: u64, count: usize) -> SimulationState {
    let mut rng = StdRng::seed_from_u64(seed);
    SimulationState::eccentric_disk(&mut rng, count)
}

fn render(format: &str, state: &SimulationState) {
    let template = match Template::parse(format) {
        Ok(t) => t,
        Err(e) => {
            println!("ERROR: {}", e);
            println!("  {}", format);
            println!("  {}^", " ".repeat(e.offset()));
            return;
        }
    };

    match template.evaluate(state) {
        Ok(line) => {
            println!("\n--- Output ---");
            println!("{}", line);
            println!("--- End ---\n");
        }
        Err(e) => println!("ERROR: {}", e),
    }
}

fn print_particles(state: &SimulationState) {
    let primary = state.primary;
    for (index, p) in state.particles.iter().enumerate() {
        let marker = if Some(p.id) == primary { " (primary)" } else { "" };
        let orbit = match state.orbit(index) {
            Ok(o) => format!("a={:.4} e={:.4}", o.semi_major_axis, o.eccentricity),
            Err(e) => format!("no orbit: {}", e),
        };
        println!(
            "  {:>4} {:<12} m={:<10} d={:.4} {}{}",
            p.id.0,
            p.name,
            p.mass,
            p.distance(),
            orbit,
            marker
        );
    }
}

fn print_tags() {
    println!("Simulation (#s..):");
    for tag in SimTag::ALL {
        println!("  #s{:<3} {}", tag.code(), tag.description());
    }
    println!("Particle (#p.. inside {{}}, #a.. average, #d.. standard deviation):");
    for tag in ParticleTag::ALL {
        println!("  #p{:<3} {}", tag.code(), tag.description());
    }
}

fn print_usage() {
    println!("Preview: interactive shell for rendering report formats.");
    println!();
    println!("Usage: preview [--snapshot <path>] [--disk <n>] [--seed <n>] [--format <fmt>]");
    println!();
    println!("  --snapshot <path>  RON snapshot to render against");
    println!("  --disk <n>         Stars in the generated disk when no snapshot is given (default: 25)");
    println!("  --seed <n>         RNG seed for generated disks (default: 42)");
    println!("  --format <fmt>     Initial format");
}

fn print_help() {
    println!("Commands:");
    println!("  fmt <format>    Parse a format and render it");
    println!("  render          Render the current format again");
    println!("  load <path>     Load a snapshot from a RON file");
    println!("  disk <n>        Generate an eccentric disk of n stars");
    println!("  seed <n>        Set RNG seed for generated disks");
    println!("  primary <id>    Measure orbits against a particle ('none' for the barycenter)");
    println!("  particles       List particles");
    println!("  tags            List value tokens");
    println!("  help            Show this help");
    println!("  quit            Exit");
}
