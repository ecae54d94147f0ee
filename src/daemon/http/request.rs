//! HTTP requests.

use std::{fmt, str};
use std::borrow::Cow;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::Method;
use hyper::body::Body;
use hyper::header::AUTHORIZATION;
use hyper::http::uri::PathAndQuery;
use percent_encoding::percent_decode;
use crate::auth::secrets_match;
use crate::commons::error::Error;
use crate::constants::ADMIN_SUBJECT;
use crate::daemon::config::Config;
use super::response::HttpResponse;
use super::server::HttpServer;


//------------ HyperRequest --------------------------------------------------

/// A type alias for the request we receive from Hyper.
pub type HyperRequest = hyper::Request<hyper::body::Incoming>;


//------------ Request -------------------------------------------------------

/// An enriched request.
pub struct Request<'a> {
    /// The underlying raw request.
    request: HyperRequest,

    /// The server the request was made to.
    server: &'a HttpServer,

    /// The limits for reading the body of the request.
    limits: BodyLimits,
}

impl<'a> Request<'a> {
    pub fn new(
        request: HyperRequest, server: &'a HttpServer, limits: BodyLimits,
    ) -> Self {
        Self { request, server, limits }
    }

    /// Checks whether the request is a GET or returns an error response.
    pub fn check_get(&self) -> Result<(), HttpResponse> {
        match *self.request.method() {
            Method::GET => Ok(()),
            _ => Err(HttpResponse::method_not_allowed()),
        }
    }

    /// Checks whether the request is a POST or returns an error response.
    pub fn check_post(&self) -> Result<(), HttpResponse> {
        match *self.request.method() {
            Method::POST => Ok(()),
            _ => Err(HttpResponse::method_not_allowed()),
        }
    }

    /// Returns the current request path.
    pub fn path(&self) -> Result<RequestPath, InvalidPath> {
        RequestPath::from_request(self)
    }

    /// Checks the bearer token and progresses to the next processing stage.
    ///
    /// Returns the [`AuthedRequest`] and the subject to use for auditing, or
    /// an Unauthorized response.
    pub fn proceed_admin(
        self
    ) -> Result<(AuthedRequest<'a>, &'static str), HttpResponse> {
        let admin_token = self.server.config().admin_token.as_str();
        let token = self.request.headers().get(AUTHORIZATION).and_then(
            |value| value.to_str().ok()
        ).and_then(|value| value.strip_prefix("Bearer "));
        match token {
            None => {
                return Err(HttpResponse::unauthorized(
                    "missing bearer token".into()
                ))
            }
            Some(token) if !secrets_match(token.trim(), admin_token) => {
                return Err(HttpResponse::unauthorized(
                    "invalid bearer token".into()
                ))
            }
            Some(_) => { }
        }
        Ok((self.proceed_unchecked(), ADMIN_SUBJECT))
    }

    /// Permits the request to the next processing stage.
    pub fn proceed_unchecked(self) -> AuthedRequest<'a> {
        AuthedRequest {
            request: self.request,
            server: self.server,
            limits: self.limits,
        }
    }
}


//------------ AuthedRequest -------------------------------------------------

/// A request that has been checked for the correct access permissions.
///
/// This type allows access to the request’s body and, by way of reading the
/// body or forcing it to be empty, to the server.
pub struct AuthedRequest<'a> {
    request: HyperRequest,
    server: &'a HttpServer,
    limits: BodyLimits,
}

impl<'a> AuthedRequest<'a> {
    /// Ensures the body is empty.
    pub fn empty(self) -> Result<&'a HttpServer, Error> {
        if self.request.body().size_hint().upper() != Some(0) {
            return Err(Error::ApiInvalidForm("unexpected body".into()))
        }
        Ok(self.server)
    }

    /// Returns the raw bytes of the request body.
    pub async fn read_bytes(self) -> Result<(&'a HttpServer, Bytes), Error> {
        let limit = self.limits.post_limit_api;

        // A Content-Length above the limit is refused right away. Bodies
        // without one are cut off by `Limited` once they grow too big.
        if self.request.body().size_hint().lower() > limit {
            return Err(Error::ApiPostTooBig(limit));
        }

        let bytes = Limited::new(
            self.request.into_body(),
            limit.try_into().unwrap_or(usize::MAX),
        ).collect().await.map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                Error::ApiPostTooBig(limit)
            }
            else {
                Error::ApiPostCannotRead(err.to_string())
            }
        })?.to_bytes();
        Ok((self.server, bytes))
    }
}


//------------ RequestPath ---------------------------------------------------

/// The path of a request’s URI.
///
/// It primarily allows iterating over the path segments.
#[derive(Debug, Clone)]
pub struct RequestPath {
    path: Result<PathAndQuery, String>,
}

impl RequestPath {
    fn from_request(request: &Request) -> Result<Self, InvalidPath> {
        let path = if let Cow::Owned(some) = percent_decode(
            request.request.uri().path().as_bytes()
        ).decode_utf8().map_err(|_| InvalidPath)? {
            Err(some)
        }
        else {
            Ok(
                request.request.uri().path_and_query()
                    .ok_or(InvalidPath)?.clone()
            )
        };
        Ok(Self { path })
    }

    pub fn as_str(&self) -> &str {
        match self.path.as_ref() {
            Ok(path) => path.path(),
            Err(path) => path.as_str()
        }
    }

    pub fn iter(&self) -> PathIter {
        PathIter::new(self.as_str())
    }
}

impl AsRef<str> for RequestPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}


//------------ PathIter ------------------------------------------------------

#[derive(Debug)]
pub struct PathIter<'a> {
    remaining: Option<&'a str>,
}

impl<'a> PathIter<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            remaining: Some(path.strip_prefix('/').unwrap_or(path))
        }
    }

    /// Returns a copy with a possible trailing slash removed.
    pub fn strip_trailing_slash(&self) -> Self {
        // Some("") means there was a trailing slash and we are now just
        // past it.
        let remaining = match self.remaining {
            Some("") | None => None,
            Some(remaining) => {
                Some(remaining.strip_suffix('/').unwrap_or(remaining))
            }
        };
        Self { remaining }
    }

    /// Checks that the path has been exhausted.
    ///
    /// Returns a 404 error response if it isn’t.
    pub fn check_exhausted(&self) -> Result<(), HttpResponse> {
        if self.remaining.is_some() {
            Err(HttpResponse::not_found())
        }
        else {
            Ok(())
        }
    }
}

impl<'a> Iterator for PathIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining?;
        let slash = match remaining.find('/') {
            Some(pos) => pos,
            None => {
                self.remaining = None;
                return Some(remaining)
            }
        };
        self.remaining = Some(&remaining[slash + 1..]);
        Some(&remaining[..slash])
    }
}


//------------ BodyLimits ----------------------------------------------------

/// The size limits of a request body.
#[derive(Clone, Copy, Debug)]
pub struct BodyLimits {
    /// The POST limit for API data.
    post_limit_api: u64,
}

impl BodyLimits {
    /// Creates the limits from the config.
    pub fn from_config(config: &Config) -> Self {
        Self { post_limit_api: config.post_limit_api }
    }
}


//------------ InvalidPath ---------------------------------------------------

/// An error happened while preparing the request path.
#[derive(Clone, Copy, Debug)]
pub struct InvalidPath;

impl From<InvalidPath> for Error {
    fn from(_: InvalidPath) -> Self {
        Error::ApiUnknownResource
    }
}

impl fmt::Display for InvalidPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid request path")
    }
}


//============ Tests =========================================================
