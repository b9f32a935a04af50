use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use keel_context::{ContextStore, DEFAULT_RELEVANCE};
use keel_core::simulator::{run_simulator, SimulatorConfig};
use keel_core::telemetry::{self, LogFormat};
use keel_core::KeelConfig;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("keel")
        .version(keel_core::VERSION)
        .about("Transactional state and bounded working memory for agent runs")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the seeded rollback simulator")
                .arg(
                    Arg::new("runs")
                        .long("runs")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Number of independent runs"),
                )
                .arg(
                    Arg::new("steps")
                        .long("steps")
                        .default_value("200")
                        .value_parser(value_parser!(usize))
                        .help("Operations per run"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("window-limit")
                        .long("window-limit")
                        .value_parser(value_parser!(usize))
                        .help("Override the working memory window of every run"),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Continue a run after its first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("context")
                .about("Load files into segments and print the bounded view")
                .arg(
                    Arg::new("max-tokens")
                        .long("max-tokens")
                        .default_value("2000")
                        .value_parser(value_parser!(usize))
                        .help("Token budget for the view"),
                )
                .arg(
                    Arg::new("focus")
                        .long("focus")
                        .help("Segment to favour"),
                )
                .arg(
                    Arg::new("segment")
                        .long("segment")
                        .action(ArgAction::Append)
                        .required(true)
                        .help("NAME=FILE; paragraphs of FILE become items of NAME"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Print the effective configuration")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<KeelConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Ok(KeelConfig::load(path)?),
        None => Ok(KeelConfig::default()),
    }
}

fn simulate(config: &KeelConfig, args: &ArgMatches) -> anyhow::Result<bool> {
    let mut context = match args.get_one::<PathBuf>("config") {
        Some(_) => config.context.clone(),
        None => SimulatorConfig::default().context,
    };
    if let Some(limit) = args.get_one::<usize>("window-limit") {
        context.window_limit = *limit;
    }

    let config = SimulatorConfig {
        seed: *args.get_one::<u64>("seed").context("missing --seed")?,
        runs: *args.get_one::<usize>("runs").context("missing --runs")?,
        steps_per_run: *args.get_one::<usize>("steps").context("missing --steps")?,
        stop_on_first_violation: !args.get_flag("keep-going"),
        context,
        ..SimulatorConfig::default()
    };

    let report = run_simulator(config)?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(report.passed())
}

fn context(config: &KeelConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let max_tokens = *args.get_one::<usize>("max-tokens").context("missing --max-tokens")?;
    let focus = args.get_one::<String>("focus").map(String::as_str);

    let mut store = ContextStore::new(config.context.clone());
    for entry in args.get_many::<String>("segment").into_iter().flatten() {
        let Some((name, path)) = entry.split_once('=') else {
            bail!("segment must be NAME=FILE, got {entry:?}");
        };
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            store.add_content(name, paragraph, DEFAULT_RELEVANCE);
        }
    }

    tracing::info!(
        total_tokens = store.total_tokens(),
        should_compress = store.should_compress(store.total_tokens()),
        "Context loaded"
    );
    println!("{}", store.bounded_context(max_tokens, focus));
    Ok(())
}

fn report(config: &KeelConfig, args: &ArgMatches) -> anyhow::Result<()> {
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("Keel {}", keel_core::VERSION);
        println!();
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        cli().print_help()?;
        return Ok(());
    };

    let format = if args.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    telemetry::init(format, telemetry::DEFAULT_FILTER);

    let config = load_config(args)?;

    match name {
        "simulate" => {
            let passed = simulate(&config, args)?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        "context" => context(&config, args),
        "report" => report(&config, args),
        other => bail!("unknown subcommand {other}"),
    }
}
