//! Various crate-wide constants.

use crate::commons::confstore::Segment;


//------------ Binary Names -------------------------------------------------

/// The friendly name of the `cmsadmind` binary.
pub const CMSADMIN_SERVER_APP: &str = "CMS Admin Daemon";

/// The friendly name of the `cmsadminc` binary.
pub const CMSADMIN_CLIENT_APP: &str = "CMS Admin Client";

/// The version of the crate.
pub const CMSADMIN_VERSION: &str = env!("CARGO_PKG_VERSION");


//------------ Config Files Paths -------------------------------------------

/// The default path to the daemon config file.
pub const CMSADMIN_DEFAULT_CONFIG_FILE: &str = "/etc/cmsadmin.conf";


//------------ Environment Variables ----------------------------------------

/// The environment variable with the log level.
///
/// The variable should contain the name of a [`log::LevelFilter`]. It will
/// be overwritten by the config file. The default is “info.”
pub const CMSADMIN_ENV_LOG_LEVEL: &str = "CMSADMIN_LOG_LEVEL";

/// The environment variable with the admin token.
///
/// Used by the daemon if the config file has no `admin_token` and by
/// `cmsadminc` to pick up the token without a command line argument.
pub const CMSADMIN_ENV_ADMIN_TOKEN: &str = "CMSADMIN_ADMIN_TOKEN";

/// The environment variable with the server URI for `cmsadminc`.
pub const CMSADMIN_ENV_SERVER: &str = "CMSADMIN_SERVER";


//------------ HTTP -----------------------------------------------------------

/// The default limit for admin request bodies.
pub const HTTP_POST_LIMIT_API: u64 = 256 * 1024;

/// The user agent sent by `cmsadminc`.
pub const HTTP_USER_AGENT: &str = concat!("cmsadminc/", env!("CARGO_PKG_VERSION"));

/// The subject recorded in the audit log for requests using the admin token.
pub const ADMIN_SUBJECT: &str = "admin";


//------------ Configuration Store Layout ------------------------------------

/// The root sub store of the authentication subsystem.
pub const AUTHS_ROOT: &Segment = Segment::make("auths");

/// The root sub store of the jobs scheduler.
pub const JOBS_ROOT: &Segment = Segment::make("jobsScheduler");

/// The sub store holding plugin registrations.
pub const IMPL_SUB_STORE: &Segment = Segment::make("impl");

/// The sub store holding authentication manager instances.
pub const AUTH_INSTANCE_SUB_STORE: &Segment = Segment::make("instance");

/// The sub store holding job instances.
pub const JOB_INSTANCE_SUB_STORE: &Segment = Segment::make("job");

/// The key of the class reference in a plugin sub store.
pub const PROP_CLASS: &str = "class";

/// The key of the plugin id in an instance sub store.
pub const PROP_PLUGIN: &str = "pluginName";


//------------ Password Hashing ----------------------------------------------

/// The scrypt cost parameter used for `PasswdAuth` password hashes.
pub const PW_HASH_LOG_N: u8 = 13;

/// The scrypt block size parameter.
pub const PW_HASH_R: u32 = 8;

/// The scrypt parallelization parameter.
pub const PW_HASH_P: u32 = 1;
