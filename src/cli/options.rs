//! The options for the command line client.

use std::io::{self, BufRead};
use clap::Parser;
use url::Url;
use crate::auth::PasswdAuth;
use crate::constants::{CMSADMIN_ENV_ADMIN_TOKEN, CMSADMIN_ENV_SERVER};
use crate::daemon::admin::{
    AdminRequest, AdminResponse, AdminStatus, AuthAdmin, JobsAdmin, OpScope,
    OpType,
};
use super::client::{AdminClient, Error};


//------------ Options -------------------------------------------------------

/// The command line options for the client.
#[derive(clap::Parser)]
#[command(
    version,
    about = "The cmsadmin command line client.",
)]
pub struct Options {
    #[command(flatten)]
    pub general: GeneralOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Creates the options from the process arguments.
    ///
    /// If the arguments won’t result in usable options, exits the process.
    pub fn from_args() -> Self {
        Self::parse()
    }
}


//------------ GeneralOptions ------------------------------------------------

#[derive(clap::Args)]
pub struct GeneralOptions {
    /// The full URI to the daemon.
    #[arg(
        short, long,
        env = CMSADMIN_ENV_SERVER,
        default_value = "http://localhost:3080/"
    )]
    pub server: Url,

    /// The admin token of the daemon.
    #[arg(
        short, long,
        env = CMSADMIN_ENV_ADMIN_TOKEN,
        hide_env_values = true,
    )]
    pub token: Option<String>,
}


//------------ Command -------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum Command {
    /// Check that the daemon is up.
    Health,

    /// Manage authentication manager plugins and instances.
    Auths(Admin),

    /// Manage job plugins and instances and the scheduler.
    Jobs(Admin),

    /// Hash a password read from stdin for a PasswdAuth instance.
    PasswdHash(PasswdHash),
}

impl Command {
    /// Runs the command and returns the status to report.
    pub async fn run(self, client: &AdminClient) -> Result<AdminStatus, Error> {
        match self {
            Command::Health => {
                client.health().await?;
                println!("ok");
                Ok(AdminStatus::Success)
            }
            Command::Auths(admin) => admin.run(client, AuthAdmin::PATH).await,
            Command::Jobs(admin) => admin.run(client, JobsAdmin::PATH).await,
            Command::PasswdHash(cmd) => cmd.run(),
        }
    }
}


//------------ Admin ---------------------------------------------------------

#[derive(clap::Args)]
pub struct Admin {
    /// The operation: read, search, add, delete, modify or process.
    #[arg(long, value_parser = parse_op)]
    pub op: OpType,

    /// What to operate on: impl, instance or settings.
    #[arg(long, default_value = "instance")]
    pub scope: OpScope,

    /// The id of the plugin or instance.
    #[arg(long)]
    pub id: Option<String>,

    /// A parameter, may be given more than once.
    #[arg(short = 'p', long = "param", value_name = "name=value")]
    #[arg(value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

impl Admin {
    pub fn request(&self) -> AdminRequest {
        let mut request = AdminRequest::new()
            .with(AdminRequest::OP_TYPE, self.op.as_str())
            .with(AdminRequest::OP_SCOPE, self.scope.as_str());
        if let Some(id) = self.id.as_ref() {
            request = request.with(AdminRequest::RS_ID, id.as_str());
        }
        for (name, value) in &self.params {
            request = request.with(name.as_str(), value.as_str());
        }
        request
    }

    async fn run(
        self, client: &AdminClient, path: &str
    ) -> Result<AdminStatus, Error> {
        let response = client.admin(path, &self.request()).await?;
        report(&response);
        Ok(response.status)
    }
}

/// Prints a response: pairs to stdout, problems to stderr.
fn report(response: &AdminResponse) {
    for pair in response.pairs.iter() {
        println!("{}={}", pair.name, pair.value);
    }
    match (response.status, response.error.as_ref()) {
        (AdminStatus::Success, _) => { }
        (status, Some(error)) => eprintln!("{status}: {error}"),
        (status, None) => eprintln!("{status}"),
    }
}

/// Parses an operation with or without the `OP_` prefix in any case.
fn parse_op(s: &str) -> Result<OpType, String> {
    let s = s.to_ascii_uppercase();
    let s = if s.starts_with("OP_") { s } else { format!("OP_{s}") };
    s.parse().map_err(|err: crate::commons::error::Error| err.to_string())
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.into(), value.into()))
        }
        _ => Err(format!("expected name=value, got '{s}'"))
    }
}


//------------ PasswdHash ----------------------------------------------------

#[derive(clap::Args)]
pub struct PasswdHash {
    /// The hex encoded salt of the PasswdAuth instance.
    #[arg(long)]
    pub salt: String,

    /// The user id to print the parameter for.
    #[arg(long)]
    pub id: String,
}

impl PasswdHash {
    /// Prints the `user_<id>=<hash>` parameter for the password on stdin.
    fn run(self) -> Result<AdminStatus, Error> {
        let salt = hex::decode(&self.salt).map_err(|err| {
            Error::Input(format!("invalid salt: {err}"))
        })?;
        let mut password = String::new();
        io::stdin().lock().read_line(&mut password).map_err(|err| {
            Error::Input(format!("cannot read password: {err}"))
        })?;
        let hash = PasswdAuth::hash_password(&password, &salt).map_err(
            Error::Input
        )?;
        println!("{}{}={}", PasswdAuth::USER_PREFIX, self.id, hash);
        Ok(AdminStatus::Success)
    }
}


//============ Tests =========================================================
