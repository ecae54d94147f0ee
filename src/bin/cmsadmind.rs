use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use cmsadmin::constants::{
    CMSADMIN_DEFAULT_CONFIG_FILE, CMSADMIN_SERVER_APP, CMSADMIN_VERSION,
};
use cmsadmin::daemon::config::Config;
use cmsadmin::daemon::start::start_daemon;


/// The plugin and instance administration daemon.
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    /// Override the path to the config file
    #[arg(
        short, long,
        value_name = "FILE",
        default_value = CMSADMIN_DEFAULT_CONFIG_FILE,
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    match Config::create(&args.config) {
        Ok(config) => {
            log::info!("Starting {CMSADMIN_SERVER_APP} v{CMSADMIN_VERSION}");
            if let Err(e) = start_daemon(Arc::new(config)).await {
                eprintln!("{CMSADMIN_SERVER_APP} failed: {e}");
                ::std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            ::std::process::exit(1);
        }
    }
}
