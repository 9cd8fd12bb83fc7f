use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use fractal_cli::bench::config::BenchConfig;
use fractal_cli::bench::run::{is_fatal, list_models, run_benchmark, write_synthetic_dataset};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FRACTAL_LOG", "error,fractal=info"))
        .init();

    let matches = Command::new("fractal")
        .version(clap::crate_version!())
        .about("Benchmark binary classifiers on fractal-dimension features")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("bench")
                .about("Train every registered model and write the metric table")
                .arg(
                    Arg::new("config")
                        .help("Path to a JSON benchmark configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Input feature CSV. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Destination of the metrics CSV. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the split and stochastic models.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help("Also write an HTML report to this path.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Only run this registry entry (repeatable).")
                        .action(ArgAction::Append)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                ),
        )
        .subcommand(Command::new("models").about("List the registered models and their hyper-parameters"))
        .subcommand(
            Command::new("synth")
                .about("Write a synthetic dataset in the input schema")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Destination CSV")
                        .default_value("sample_data/fractal_features.csv")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("per_class")
                        .long("per-class")
                        .help("Rows per label")
                        .default_value("100")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("bench", sub_m)) => handle_bench(sub_m),
        Some(("models", _)) => {
            for line in list_models(BenchConfig::default().seed)? {
                println!("{}", line);
            }
            Ok(())
        }
        Some(("synth", sub_m)) => handle_synth(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_bench(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    let config = BenchConfig::from_arguments(config_path, matches)?;

    match config_path {
        Some(path) => log::info!("[fractal::bench] Using config: {:?}", path),
        None => {
            let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
            log::info!("[fractal::bench] No config provided; effective config:\n{}", default_json);
        }
    }

    match run_benchmark(&config) {
        Ok(_) => Ok(()),
        Err(e) if is_fatal(&e) => {
            log::error!("Benchmark aborted: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
        Err(e) => {
            log::warn!("Benchmark finished with a per-model error: {:#}", e);
            Ok(())
        }
    }
}

fn handle_synth(matches: &ArgMatches) -> Result<()> {
    let output: &PathBuf = matches.get_one("output").expect("output has a default");
    let per_class: usize = *matches.get_one("per_class").expect("per_class has a default");
    let seed: u64 = *matches.get_one("seed").expect("seed has a default");

    match write_synthetic_dataset(output, per_class, seed) {
        Ok(()) => {
            println!("{}", output.display());
            Ok(())
        }
        Err(e) => {
            log::error!("Synthetic data generation failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
    }
}
