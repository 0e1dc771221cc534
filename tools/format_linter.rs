/// Format Linter: validates report formats and report config files.
///
/// Usage: format_linter <format | config.ron | config_dir> [--explain] [--stats]
///        format_linter --tags

use orbit_report::core::ast::{Item, Node, Template};
use orbit_report::core::report::{Destination, ReportConfig, ReportSpec};
use orbit_report::schema::tag::{ParticleTag, Selector, SimTag};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: format_linter <format | config.ron | config_dir> [--explain] [--stats]");
        println!("       format_linter --tags");
        process::exit(0);
    }

    if args[1] == "--tags" {
        print_vocabulary();
        process::exit(0);
    }

    let target = &args[1];
    let explain = args[2..].iter().any(|a| a == "--explain");
    let stats = args[2..].iter().any(|a| a == "--stats");

    let path = Path::new(target);
    let specs: Vec<ReportSpec> = if path.is_file() {
        match ReportConfig::load_from_ron(path) {
            Ok(config) => config.reports,
            Err(e) => {
                eprintln!("ERROR: Failed to load report config: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        let mut specs = Vec::new();
        load_configs_recursive(path, &mut specs);
        specs
    } else {
        // Not a path: lint the argument itself as a console format.
        vec![ReportSpec {
            destination: Destination::Console,
            interval: -1.0,
            format: target.clone(),
        }]
    };

    println!("Loaded {} report formats", specs.len());

    let (errors, warnings, usage) = lint_reports(&specs, explain);

    println!("\n=== Format Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    if stats {
        print_usage(&usage);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_configs_recursive(dir: &Path, specs: &mut Vec<ReportSpec>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_configs_recursive(&path, specs);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match ReportConfig::load_from_ron(&path) {
                    Ok(config) => {
                        println!("  Loaded: {}", path.display());
                        specs.extend(config.reports);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

type TagUsage = FxHashMap<String, usize>;

fn lint_reports(specs: &[ReportSpec], explain: bool) -> (Vec<String>, Vec<String>, TagUsage) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut usage = TagUsage::default();
    let mut files: FxHashMap<&Path, usize> = FxHashMap::default();

    for spec in specs {
        if let Destination::File(path) = &spec.destination {
            *files.entry(path.as_path()).or_insert(0) += 1;
        }

        let template = match Template::parse(&spec.format) {
            Ok(t) => t,
            Err(e) => {
                errors.push(format!(
                    "{}: {}\n    {}\n    {}^",
                    spec.destination,
                    e,
                    spec.format,
                    " ".repeat(e.offset())
                ));
                continue;
            }
        };

        if spec.interval == 0.0 {
            warnings.push(format!(
                "{}: interval 0 emits on every update; use a negative interval to say so",
                spec.destination
            ));
        }

        if template.nodes.iter().all(|n| matches!(n, Node::Literal(_))) {
            warnings.push(format!(
                "{}: format {:?} has no value tokens",
                spec.destination, spec.format
            ));
        }

        let last = template.nodes.len().saturating_sub(1);
        for (i, node) in template.nodes.iter().enumerate() {
            if let Node::Group(group) = node {
                if i != last && matches!(group.items.last(), Some(Item::Literal(_))) {
                    warnings.push(format!(
                        "{}: group {} is not at the end of the format, so its trailing separator is kept on the last particle",
                        spec.destination, node
                    ));
                }
            }
        }

        count_tags(&template, &mut usage);

        if explain {
            println!("\n{} ({})", spec.destination, spec.format);
            for node in &template.nodes {
                explain_node(node);
            }
        }
    }

    for (path, count) in files {
        if count > 1 {
            errors.push(format!(
                "{} reports write to {}; each would truncate the others",
                count,
                path.display()
            ));
        }
    }

    (errors, warnings, usage)
}

fn count_tags(template: &Template, usage: &mut TagUsage) {
    let mut bump = |token: String| *usage.entry(token).or_insert(0) += 1;
    for node in &template.nodes {
        match node {
            Node::Literal(_) => {}
            Node::Simulation(_) | Node::Aggregate(_) => bump(node.to_string()),
            Node::Group(group) => {
                for item in &group.items {
                    if !matches!(item, Item::Literal(_)) {
                        bump(item.to_string());
                    }
                }
            }
        }
    }
}

fn explain_node(node: &Node) {
    match node {
        Node::Literal(text) => println!("  literal {:?}", text),
        Node::Simulation(tag) => println!("  {:<6} {}", node.to_string(), tag.description()),
        Node::Aggregate(agg) => println!(
            "  {:<6} {} of {}",
            node.to_string(),
            agg.kind().selector().description(),
            agg.tag().description()
        ),
        Node::Group(group) => {
            let elide = if group.trailing_separator().is_some() {
                ", last separator dropped"
            } else {
                ""
            };
            println!("  group, repeated per particle{}", elide);
            for item in &group.items {
                match item {
                    Item::Literal(text) => println!("    literal {:?}", text),
                    Item::Simulation(tag) => {
                        println!("    {:<6} {}", item.to_string(), tag.description())
                    }
                    Item::Particle(tag) => {
                        let orbital = if tag.is_orbital() {
                            " (relative to the reference body)"
                        } else {
                            ""
                        };
                        println!("    {:<6} {}{}", item.to_string(), tag.description(), orbital)
                    }
                    Item::Aggregate(agg) => println!(
                        "    {:<6} {} of {}",
                        item.to_string(),
                        agg.kind().selector().description(),
                        agg.tag().description()
                    ),
                }
            }
        }
    }
}

fn print_usage(usage: &TagUsage) {
    let mut counts: Vec<(&String, &usize)> = usage.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    println!("\n=== Tag Usage ===\n");
    for (token, count) in counts {
        println!("  {:<6} {}", token, count);
    }
}

fn print_vocabulary() {
    println!("Selectors:");
    for selector in Selector::ALL {
        println!("  #{}    {}", selector.code(), selector.description());
    }
    println!("\nSimulation values (#s..):");
    for tag in SimTag::ALL {
        println!("  {:<3} {:<24} {:?}", tag.code(), tag.description(), tag.kind());
    }
    println!("\nParticle values (#p.., #a.., #d..):");
    for tag in ParticleTag::ALL {
        let scope = if tag.is_aggregable() { "" } else { "  (#p only)" };
        println!(
            "  {:<3} {:<32} {:?}{}",
            tag.code(),
            tag.description(),
            tag.kind(),
            scope
        );
    }
}
