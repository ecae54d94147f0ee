//! Dispatching of HTTP requests.

use std::sync::Arc;
use crate::commons::AdminResult;
use crate::commons::error::Error;
use crate::daemon::admin::{AdminRequest, AdminResponse, AuthAdmin, JobsAdmin};
use super::request::{InvalidPath, PathIter, Request};
use super::response::HttpResponse;


//------------ DispatchError -------------------------------------------------

/// An error occured during dispatch.
///
/// This type exists so you can use the question mark operator for all
/// sorts of things during dispatch. It always ends up as the response sent
/// back to the client.
#[derive(Debug)]
pub struct DispatchError(HttpResponse);

impl DispatchError {
    pub fn into_response(self) -> HttpResponse {
        self.0
    }
}

impl From<HttpResponse> for DispatchError {
    fn from(src: HttpResponse) -> Self {
        Self(src)
    }
}

impl From<Error> for DispatchError {
    fn from(src: Error) -> Self {
        Self(HttpResponse::response_from_error(src))
    }
}

impl From<InvalidPath> for DispatchError {
    fn from(src: InvalidPath) -> Self {
        Self::from(Error::from(src))
    }
}


//------------ / -------------------------------------------------------------

pub async fn dispatch_request(
    request: Request<'_>,
    mut path: PathIter<'_>,
) -> Result<HttpResponse, DispatchError> {
    match path.next() {
        Some("health") => health(request, path),
        Some("admin") => admin(request, path).await,
        _ => Ok(HttpResponse::not_found())
    }
}


//------------ /health -------------------------------------------------------

fn health(
    request: Request<'_>, path: PathIter<'_>,
) -> Result<HttpResponse, DispatchError> {
    path.strip_trailing_slash().check_exhausted()?;
    request.check_get()?;
    request.proceed_unchecked().empty()?;
    Ok(HttpResponse::ok())
}


//------------ /admin --------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum AdminTarget {
    Auths,
    Jobs,
}

async fn admin(
    request: Request<'_>, mut path: PathIter<'_>,
) -> Result<HttpResponse, DispatchError> {
    let target = match path.next() {
        Some("auths") => AdminTarget::Auths,
        Some("jobs") => AdminTarget::Jobs,
        _ => return Ok(HttpResponse::not_found())
    };
    path.strip_trailing_slash().check_exhausted()?;
    request.check_post()?;
    let (request, subject) = request.proceed_admin()?;
    let (server, bytes) = request.read_bytes().await?;
    let admin_request = AdminRequest::parse_form(&bytes)?;

    let response = match target {
        AdminTarget::Auths => {
            process_auths(
                server.auths().clone(), subject, admin_request
            ).await?
        }
        AdminTarget::Jobs => {
            process_jobs(
                server.jobs().clone(), subject, admin_request
            ).await?
        }
    };
    Ok(HttpResponse::admin(&response))
}

/// Processes an auths request on the blocking thread pool.
///
/// Changes end with committing the store which may mean writing to disk.
async fn process_auths(
    admin: Arc<AuthAdmin>, subject: &'static str, request: AdminRequest,
) -> AdminResult<AdminResponse> {
    tokio::task::spawn_blocking(move || {
        admin.process(subject, &request)
    }).await.map_err(|err| {
        Error::custom(format!("admin task failed: {err}"))
    })?
}

async fn process_jobs(
    admin: Arc<JobsAdmin>, subject: &'static str, request: AdminRequest,
) -> AdminResult<AdminResponse> {
    tokio::task::spawn_blocking(move || {
        admin.process(subject, &request)
    }).await.map_err(|err| {
        Error::custom(format!("admin task failed: {err}"))
    })?
}
