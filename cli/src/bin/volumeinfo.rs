use clap::{ArgAction, Parser};
use std::io;
use std::path::PathBuf;
use std::process;
use umass_cli::{init_logging, resolve_special, usage_exit_code, volume_report};
use umass_core::UmassConfig;

#[derive(Parser)]
#[command(name = "volumeinfo", version)]
#[command(about = "Print the label and UUID of the volume on a device node", long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (JSON); its device_dir is searched for bare node names
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device node or image file, or a node name such as da0
    special: PathBuf,
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

    let config = match UmassConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let special = resolve_special(&cli.special, &config);
    match volume_report(&special, &mut io::stdout().lock()) {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("{}: {:?}", special.display(), e);
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

fn main() {
    process::exit(run());
}
