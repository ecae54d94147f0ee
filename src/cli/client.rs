//! Talking to the daemon over HTTP.

use std::fmt;
use std::time::Duration;
use reqwest::{Response, StatusCode};
use reqwest::header::USER_AGENT;
use url::Url;
use crate::constants::HTTP_USER_AGENT;
use crate::daemon::admin::{AdminRequest, AdminResponse};


//------------ AdminClient ---------------------------------------------------

/// A client for the admin API of a daemon.
pub struct AdminClient {
    server: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl AdminClient {
    const TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(server: Url, token: Option<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|err| Error::build(server.as_str(), err))?;
        Ok(AdminClient { server, token, client })
    }

    /// Checks that the daemon responds.
    pub async fn health(&self) -> Result<(), Error> {
        let uri = self.resolve_uri("health")?;
        let res = self.client.get(uri.clone())
            .header(USER_AGENT, HTTP_USER_AGENT)
            .send().await
            .map_err(|err| Error::execute(uri.as_str(), err))?;
        if res.status() == StatusCode::OK {
            Ok(())
        }
        else {
            Err(Error::from_res(uri.as_str(), res).await)
        }
    }

    /// Sends an admin request to the given path.
    ///
    /// Responses with status `ERROR` are returned like all others. Only
    /// failing to get an admin response at all is an error.
    pub async fn admin(
        &self, path: &str, request: &AdminRequest
    ) -> Result<AdminResponse, Error> {
        let uri = self.resolve_uri(path)?;
        let token = self.token.as_deref().ok_or(Error::MissingToken)?;
        let form: Vec<(&str, &str)> = request.iter().collect();

        let res = self.client.post(uri.clone())
            .header(USER_AGENT, HTTP_USER_AGENT)
            .bearer_auth(token)
            .form(&form)
            .send().await
            .map_err(|err| Error::execute(uri.as_str(), err))?;

        let status = res.status();
        let body = res.text().await.map_err(|err| {
            Error::response(uri.as_str(), err)
        })?;
        serde_json::from_str::<AdminResponse>(&body).map_err(|_| {
            Error::ErrorResponseWithBody(uri.to_string(), status, body)
        })
    }

    fn resolve_uri(&self, path: &str) -> Result<Url, Error> {
        self.server.join(path.trim_start_matches('/')).map_err(|err| {
            Error::build(self.server.as_str(), err)
        })
    }
}


//------------ Error ---------------------------------------------------------

type ErrorUri = String;
type ErrorMessage = String;

#[derive(Debug)]
pub enum Error {
    MissingToken,
    RequestBuild(ErrorUri, ErrorMessage),
    RequestExecute(ErrorUri, ErrorMessage),
    Response(ErrorUri, ErrorMessage),
    ErrorResponseWithBody(ErrorUri, StatusCode, String),
    Input(ErrorMessage),
}

impl Error {
    pub fn build(uri: &str, msg: impl fmt::Display) -> Self {
        Error::RequestBuild(uri.to_string(), msg.to_string())
    }

    pub fn execute(uri: &str, msg: impl fmt::Display) -> Self {
        Error::RequestExecute(uri.to_string(), msg.to_string())
    }

    pub fn response(uri: &str, msg: impl fmt::Display) -> Self {
        Error::Response(uri.to_string(), msg.to_string())
    }

    async fn from_res(uri: &str, res: Response) -> Error {
        let status = res.status();
        match res.text().await {
            Ok(body) if !body.is_empty() => {
                Error::ErrorResponseWithBody(uri.to_string(), status, body)
            }
            Ok(_) => {
                Error::response(uri, format!("unexpected status code {status}"))
            }
            Err(err) => Error::response(uri, err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingToken => {
                f.write_str(
                    "No admin token given, use --token or set \
                     CMSADMIN_ADMIN_TOKEN"
                )
            }
            Error::RequestBuild(uri, msg) => {
                write!(f, "Issue creating request for URI: {uri}, error: {msg}")
            }
            Error::RequestExecute(uri, msg) => {
                write!(f, "Issue accessing URI: {uri}, error: {msg}")
            }
            Error::Response(uri, msg) => {
                write!(
                    f, "Issue processing response from URI: {uri}, error: {msg}"
                )
            }
            Error::ErrorResponseWithBody(uri, code, body) => {
                write!(
                    f,
                    "Error response from URI: {uri}, Status: {code}, \
                     Error: {body}"
                )
            }
            Error::Input(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error { }
