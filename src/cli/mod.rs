//! The command line client.

pub use self::client::{AdminClient, Error};
pub use self::options::Options;

use crate::daemon::admin::AdminStatus;

pub mod client;
pub mod options;


/// Runs the client with the given options.
///
/// Returns the status of the response. Getting no response at all is an
/// error.
pub async fn run(options: Options) -> Result<AdminStatus, Error> {
    let client = AdminClient::new(
        options.general.server, options.general.token
    )?;
    options.command.run(&client).await
}
