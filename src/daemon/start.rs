//! Starting the daemon.

use std::process;
use std::sync::Arc;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use log::{error, info};
use tokio::net::TcpListener;
use tokio::select;
use crate::auth::{self, AuthSubsystem};
use crate::commons::audit::{AuditSink, LogAuditSink};
use crate::commons::confstore::ConfigStore;
use crate::commons::error::Error;
use crate::commons::file;
use crate::jobs::{self, JobsScheduler};
use crate::plugin::{self, ClassCatalog};
use super::config::Config;
use super::http::HttpServer;


/// Runs the daemon until it is interrupted or something breaks.
pub async fn start_daemon(config: Arc<Config>) -> Result<(), Error> {
    if let Some(pid_file) = config.pid_file.as_ref() {
        file::save_atomic(
            process::id().to_string().as_bytes(), pid_file, false
        ).map_err(|err| {
            Error::custom(format!("Could not write PID file: {err}"))
        })?;
    }

    let store = ConfigStore::open(&config.storage_uri)?;
    info!("Using configuration store {}", config.storage_uri);

    let catalog = Arc::new(builtin_catalog().map_err(plugin::Error::from)?);
    let audit: Arc<dyn AuditSink> = Arc::new(LogAuditSink);

    let auths = Arc::new(AuthSubsystem::new(&store, catalog.clone())?);
    let jobs = Arc::new(
        JobsScheduler::new(&store, catalog, audit.clone())?
    );
    auths.load()?;
    jobs.load()?;

    let server = Arc::new(HttpServer::new(
        auths.clone(), jobs.clone(), audit, config.clone()
    ));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await.map_err(|err| {
        Error::custom(format!("Could not bind to {addr}: {err}"))
    })?;
    info!("Listening on {addr}");

    let tasks = futures_util::future::select_all([
        tokio::spawn(serve(listener, server)),
        tokio::spawn(jobs.clone().run()),
    ]);

    let res = select!(
        _ = tasks => {
            error!("http server or scheduler stopped unexpectedly");
            Err(Error::custom("stopping cmsadmin daemon"))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    );

    auths.shutdown();
    jobs.shutdown();
    res
}

/// Creates a catalog with all built-in classes.
pub fn builtin_catalog() -> Result<ClassCatalog, plugin::ClassLoadError> {
    let catalog = ClassCatalog::new();
    auth::register_builtin_classes(&catalog)?;
    jobs::register_builtin_classes(&catalog)?;
    Ok(catalog)
}

/// Serves HTTP connections accepted from the listener.
///
/// Only returns if accepting connections fails.
pub async fn serve(listener: TcpListener, server: Arc<HttpServer>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _addr)) => stream,
            Err(err) => {
                error!("Fatal error in HTTP server: {err}");
                return;
            }
        };
        let server = server.clone();
        tokio::task::spawn(async move {
            let _ = hyper_util::server::conn::auto::Builder::new(
                TokioExecutor::new(),
            )
            .serve_connection(
                TokioIo::new(stream),
                service_fn(move |req| {
                    let server = server.clone();
                    async move { server.process_request(req).await }
                }),
            )
            .await;
        });
    }
}
