use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use std::io;
use std::path::PathBuf;
use std::process;
use umass_cli::{attach, detach, init_logging, usage_exit_code};
use umass_core::UmassConfig;
use umass_platform::PlatformDeviceTree;

#[derive(Parser)]
#[command(name = "umassaction", version)]
#[command(about = "Resolve a mass-storage attach event to its disk and describe the volume", long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bus driver name in the device tree
    #[arg(long)]
    bus_driver: Option<String>,

    /// Peripheral driver name in the device tree
    #[arg(long)]
    peripheral_driver: Option<String>,

    /// Directory holding the device nodes
    #[arg(long)]
    device_dir: Option<PathBuf>,

    /// Event kind (attach, detach)
    command: String,

    /// Device that raised the event, e.g. umass0
    device: String,

    /// Device type reported with the event
    #[arg(value_name = "TYPE")]
    kind: String,
}

fn load_config(cli: &Cli) -> anyhow::Result<UmassConfig> {
    let mut config = UmassConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(driver) = &cli.bus_driver {
        config.bus_driver = driver.clone();
    }
    if let Some(driver) = &cli.peripheral_driver {
        config.peripheral_driver = driver.clone();
    }
    if let Some(dir) = &cli.device_dir {
        config.device_dir = dir.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return usage_exit_code(&e);
        }
    };
    init_logging(cli.verbose);
    log::debug!("{} event for {} ({})", cli.command, cli.device, cli.kind);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return 1;
        }
    };

    let mut out = io::stdout().lock();
    match cli.command.as_str() {
        "attach" => {
            let tree = PlatformDeviceTree::with_program(&config.camcontrol);
            match attach(tree, &config, &cli.device, &mut out) {
                Ok(_) => 0,
                Err(e) => {
                    let code = e.exit_code();
                    eprintln!("error: {:#}", anyhow::Error::new(e));
                    code
                }
            }
        }
        "detach" => match detach(&cli.device, &mut out) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {}", e);
                2
            }
        },
        other => {
            eprintln!("No such command: {}", other);
            eprintln!("{}", Cli::command().render_usage());
            1
        }
    }
}

fn main() {
    process::exit(run());
}
