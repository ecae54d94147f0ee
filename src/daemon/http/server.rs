//! The hyper based HTTP server of the daemon.
//!
//! Here we deal with requests once a connection has been accepted: wrap
//! them up, route them to the admins and log what happened.

use std::convert::Infallible;
use std::sync::Arc;
use log::{debug, error, warn};
use crate::auth::AuthSubsystem;
use crate::commons::audit::AuditSink;
use crate::daemon::admin::{AuthAdmin, JobsAdmin};
use crate::daemon::config::Config;
use crate::jobs::JobsScheduler;
use super::dispatch::dispatch_request;
use super::request::{BodyLimits, HyperRequest, Request};
use super::response::{HttpResponse, HyperResponse};


//------------ HttpServer ----------------------------------------------------

pub struct HttpServer {
    auths: Arc<AuthAdmin>,
    jobs: Arc<JobsAdmin>,
    config: Arc<Config>,
}

impl HttpServer {
    pub fn new(
        auths: Arc<AuthSubsystem>,
        jobs: Arc<JobsScheduler>,
        audit: Arc<dyn AuditSink>,
        config: Arc<Config>,
    ) -> Self {
        HttpServer {
            auths: Arc::new(AuthAdmin::new(auths, audit.clone())),
            jobs: Arc::new(JobsAdmin::new(jobs, audit)),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auths(&self) -> &Arc<AuthAdmin> {
        &self.auths
    }

    pub fn jobs(&self) -> &Arc<JobsAdmin> {
        &self.jobs
    }

    /// Processes a single request and returns the response.
    ///
    /// Every request gets a response, errors included, so this never fails.
    pub async fn process_request(
        &self, request: HyperRequest
    ) -> Result<HyperResponse, Infallible> {
        let method = request.method().clone();
        let uri = request.uri().path().to_string();

        let request = Request::new(
            request, self, BodyLimits::from_config(&self.config)
        );
        let response = match request.path() {
            Ok(path) => {
                match dispatch_request(request, path.iter()).await {
                    Ok(response) => response,
                    Err(err) => err.into_response(),
                }
            }
            Err(err) => HttpResponse::response_from_error(err.into()),
        };

        let status = response.status();
        match response.cause() {
            Some(cause) if status.is_server_error() => {
                error!("{method} {uri}: {status}: {cause}")
            }
            Some(cause) => warn!("{method} {uri}: {status}: {cause}"),
            None => debug!("{method} {uri}: {status}"),
        }
        Ok(response.into_hyper())
    }
}
