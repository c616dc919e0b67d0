use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use prd_cli::{run_simulator, SimulatorConfig};
use prd_core::PrdConfig;
use prd_state::SectionCatalog;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("prd-forge")
        .version(prd_cli::VERSION)
        .about("PRD Forge - chat-driven product requirement documents")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the seeded session simulator")
                .arg(
                    Arg::new("ops")
                        .long("ops")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(Command::new("catalog").about("Print the section catalog"))
        .subcommand(
            Command::new("config").about("Show configuration").arg(
                Arg::new("print")
                    .long("print")
                    .action(ArgAction::SetTrue)
                    .help("Print the effective configuration as TOML"),
            ),
        );

    let matches = cli.get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let ops = args.get_one::<u64>("ops").copied().unwrap_or(200);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);

            println!("Running PRD Forge simulator...");
            println!("Operations: {ops}");
            println!("Seed: {seed}");
            println!();

            let report = run_simulator(SimulatorConfig {
                seed,
                total_operations: ops,
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                session: config,
            })
            .await;

            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("catalog", _)) => {
            for (i, spec) in SectionCatalog::prd_default().entries().iter().enumerate() {
                println!("{}. {} ({})", i + 1, spec.title(), spec.id);
                if !spec.update_triggers.is_empty() {
                    println!("   triggers: {}", spec.update_triggers.join(", "));
                }
            }
        }
        Some(("config", args)) => {
            if args.get_flag("print") {
                print!("{}", config.to_toml_string()?);
            } else {
                println!("Use --print to show the effective configuration");
            }
        }
        _ => {}
    }
    Ok(())
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<PrdConfig> {
    let path = matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<PathBuf>("config"))
        .or_else(|| matches.get_one::<PathBuf>("config"));
    match path {
        Some(path) => PrdConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(PrdConfig::default()),
    }
}
