//! Common types used by the various cmsadmin components.

pub mod audit;
pub mod confstore;
pub mod error;
pub mod file;


//------------ Response Aliases ----------------------------------------------

pub type AdminResult<T> = std::result::Result<T, self::error::Error>;
