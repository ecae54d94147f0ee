use cmsadmin::cli::{self, Options};
use cmsadmin::constants::CMSADMIN_CLIENT_APP;
use cmsadmin::daemon::admin::AdminStatus;

#[tokio::main]
async fn main() {
    match cli::run(Options::from_args()).await {
        Ok(AdminStatus::Error) => ::std::process::exit(1),
        Ok(_) => { }
        Err(err) => {
            eprintln!("{CMSADMIN_CLIENT_APP}: {err}");
            ::std::process::exit(1);
        }
    }
}
