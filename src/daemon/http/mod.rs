//! The HTTP transport of the admin API.

pub use self::server::HttpServer;

pub mod request;
pub mod response;
pub mod server;

mod dispatch;
