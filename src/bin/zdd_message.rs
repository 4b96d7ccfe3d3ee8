//! ZDD Message CLI
//!
//! Records message snapshots and checks them against the current class declarations.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zdd_messages::fixture::{self, FixtureReport};
use zdd_messages::{ClassRegistry, Codec, CompatibilityChecker, FixtureStore, ZddConfig, ZddError};

#[derive(Parser)]
#[command(name = "zdd-message")]
#[command(about = "Record message snapshots and check them for zero-downtime compatibility")]
struct Cli {
    /// Configuration file (layered over zdd.toml and ZDD__* variables)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON file describing the live message classes
    #[arg(long)]
    classes: Option<PathBuf>,

    /// Fixture store directory
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Snapshot encoding
    #[arg(long, value_enum)]
    codec: Option<Codec>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a snapshot and schema for every live class
    Generate,

    /// Check recorded snapshots against the live classes
    Validate {
        /// Only check this class
        #[arg(long)]
        class: Option<String>,
    },

    /// List recorded fixtures and their checksum status
    List,

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every check passed
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = ZddConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.classes {
        config.classes.path = path;
    }
    if let Some(path) = cli.fixtures {
        config.fixtures.path = path;
    }
    if let Some(codec) = cli.codec {
        config.fixtures.codec = codec;
    }

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(true)
        }

        Commands::Generate => {
            let registry = load_registry(&config)?;
            let mut store = FixtureStore::open(&config.fixtures.path, config.fixtures.codec)?;

            println!("📝 Recording fixtures into {:?}", store.root());
            for class in fixture::generate(&mut store, &registry)? {
                println!("  ✅ {}", class);
            }
            Ok(true)
        }

        Commands::Validate { class } => {
            let registry = load_registry(&config)?;
            let store = FixtureStore::open(&config.fixtures.path, config.fixtures.codec)?;
            let checker = CompatibilityChecker::with_decoder(&registry, store.codec());

            println!("🔍 Checking fixtures in {:?}", store.root());
            println!();

            let reports = match class {
                Some(class) => {
                    let error = store
                        .load(&class)
                        .and_then(|f| checker.assert(&f.class, &f.blob, &f.schema))
                        .err();
                    vec![FixtureReport { class, error }]
                }
                None if config.validation.fail_fast => {
                    let mut reports = Vec::new();
                    for class in store.fixtures()? {
                        let fixture = store.load(&class)?;
                        let error = checker.assert(&fixture.class, &fixture.blob, &fixture.schema).err();
                        let failed = error.is_some();
                        reports.push(FixtureReport { class, error });
                        if failed {
                            break;
                        }
                    }
                    reports
                }
                None => fixture::validate_all(&store, &checker)?,
            };

            let mut all_compatible = true;
            for report in &reports {
                match &report.error {
                    None => println!("✅ {}", report.class),
                    Some(err) => {
                        all_compatible = false;
                        let label = if err.is_breaking_change() { "BREAKING CHANGE" } else { "ERROR" };
                        println!("❌ {} - {}", report.class, label);
                        println!("   └─ {}", err);
                    }
                }
            }

            println!();
            if all_compatible {
                println!("✅ {} snapshot(s) compatible with the current classes", reports.len());
            } else {
                println!("❌ Incompatible snapshots detected!");
            }
            Ok(all_compatible)
        }

        Commands::List => {
            let store = FixtureStore::open(&config.fixtures.path, config.fixtures.codec)?;
            let mut all_valid = true;

            for class in store.fixtures()? {
                match store.verify(&class) {
                    Ok(true) => println!("  ✅ {}", class),
                    Ok(false) => {
                        all_valid = false;
                        println!("  ❌ {} - checksum mismatch", class);
                    }
                    Err(ZddError::FixtureNotFound(_)) => println!("  ⚠️  {} - not in manifest", class),
                    Err(err) => {
                        all_valid = false;
                        println!("  ❌ {} - {}", class, err);
                    }
                }
            }
            Ok(all_valid)
        }
    }
}

fn load_registry(config: &ZddConfig) -> anyhow::Result<ClassRegistry> {
    ClassRegistry::load(&config.classes.path)
        .with_context(|| format!("loading class declarations from {:?}", config.classes.path))
}
