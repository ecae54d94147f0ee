//! HTTP responses.

use bytes::Bytes;
use http_body_util::{Either, Empty, Full};
use hyper::StatusCode;
use serde::Serialize;
use crate::commons::error::Error;
use crate::daemon::admin::AdminResponse;


//----------- ContentType ----------------------------------------------------

#[derive(Clone, Copy)]
enum ContentType {
    Json,
    Text,
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain",
        }
    }
}


//------------ HyperResponse -------------------------------------------------

pub type HyperResponseBody = Either<Empty<Bytes>, Full<Bytes>>;
pub type HyperResponse = hyper::Response<HyperResponseBody>;


//----------- Response -------------------------------------------------------

struct Response {
    status: StatusCode,
    content_type: ContentType,
    body: Bytes,
    cause: Option<Error>,
}

impl Response {
    fn new(status: StatusCode) -> Self {
        Response {
            status,
            content_type: ContentType::Text,
            body: Bytes::default(),
            cause: None,
        }
    }

    fn finalize(self) -> HttpResponse {
        let mut builder = hyper::Response::builder()
            .status(self.status)
            .header("Content-Type", self.content_type.as_str());

        if self.status == StatusCode::UNAUTHORIZED {
            builder = builder.header("WWW-Authenticate", "Bearer");
        }

        let body = if self.body.is_empty() {
            Either::Left(Empty::new())
        } else {
            Either::Right(Full::new(self.body))
        };

        // Status and headers are all static and valid, so building can’t
        // fail.
        let response = match builder.body(body) {
            Ok(response) => response,
            Err(_) => {
                let mut response = hyper::Response::new(
                    Either::Left(Empty::new())
                );
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        };

        HttpResponse { response, cause: self.cause }
    }
}


//------------ HttpResponse --------------------------------------------------

#[derive(Debug)]
pub struct HttpResponse {
    response: HyperResponse,
    cause: Option<Error>,
}

impl HttpResponse {
    pub fn into_hyper(self) -> HyperResponse {
        self.response
    }

    /// Returns the error that caused an error response.
    ///
    /// When logging it is more useful to have the original cause than the
    /// JSON body.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn json<O: Serialize>(status: StatusCode, object: &O) -> Self {
        match serde_json::to_vec(object) {
            Ok(json) => Response {
                status,
                content_type: ContentType::Json,
                body: json.into(),
                cause: None,
            }.finalize(),
            Err(err) => {
                Self::response_from_error(Error::custom(format!(
                    "cannot serialize response: {err}"
                )))
            }
        }
    }

    /// Returns a successful admin response.
    pub fn admin(response: &AdminResponse) -> Self {
        Self::json(StatusCode::OK, response)
    }

    /// Returns an error response with the status fitting the error.
    ///
    /// The body is an admin response with status `ERROR` so that clients
    /// only ever need to understand one format.
    pub fn response_from_error(error: Error) -> Self {
        let body = AdminResponse::from_error(&error);
        let body = serde_json::to_vec(&body).unwrap_or_else(|_| {
            error.to_string().into_bytes()
        });
        Response {
            status: error.status(),
            content_type: ContentType::Json,
            body: body.into(),
            cause: Some(error),
        }.finalize()
    }

    pub fn ok() -> Self {
        Response::new(StatusCode::OK).finalize()
    }

    pub fn not_found() -> Self {
        Self::response_from_error(Error::ApiUnknownResource)
    }

    pub fn method_not_allowed() -> Self {
        Self::response_from_error(Error::ApiUnknownMethod)
    }

    pub fn unauthorized(reason: String) -> Self {
        Self::response_from_error(Error::ApiInvalidCredentials(reason))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses() {
        let response = HttpResponse::unauthorized("missing bearer token".into());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let hyper = response.into_hyper();
        assert_eq!(
            hyper.headers().get("WWW-Authenticate").unwrap(), "Bearer"
        );
        assert_eq!(
            hyper.headers().get("Content-Type").unwrap(), "application/json"
        );

        assert_eq!(
            HttpResponse::response_from_error(Error::ApiPostTooBig(10)).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HttpResponse::method_not_allowed().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert!(HttpResponse::not_found().cause().is_some());
        assert!(HttpResponse::ok().cause().is_none());
    }
}
