//! Admin responses.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::commons::error::Error;
use crate::plugin::LifecycleOutcome;


//------------ AdminStatus ---------------------------------------------------

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminStatus {
    /// The operation succeeded.
    Success,

    /// The operation failed and changed nothing.
    Error,

    /// The operation succeeded but the process must be restarted for all
    /// of it to take effect.
    Restart,
}

impl fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AdminStatus::Success => "SUCCESS",
            AdminStatus::Error => "ERROR",
            AdminStatus::Restart => "RESTART",
        })
    }
}


//------------ NameValuePair -------------------------------------------------

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}


//------------ NameValuePairs ------------------------------------------------

/// An ordered list of names and values.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NameValuePairs(Vec<NameValuePair>);

impl NameValuePairs {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(NameValuePair { name: name.into(), value: value.into() })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|pair| pair.name == name).map(|pair| {
            pair.value.as_str()
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &NameValuePair> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}


//------------ AdminResponse -------------------------------------------------

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AdminResponse {
    pub status: AdminStatus,

    #[serde(default)]
    pub pairs: NameValuePairs,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminResponse {
    pub fn success() -> Self {
        AdminResponse {
            status: AdminStatus::Success,
            pairs: NameValuePairs::default(),
            error: None,
        }
    }

    /// A successful response with a status reflecting how a change ended.
    pub fn from_outcome(outcome: LifecycleOutcome) -> Self {
        match outcome {
            LifecycleOutcome::Done => Self::success(),
            LifecycleOutcome::RestartRequired(reason) => AdminResponse {
                status: AdminStatus::Restart,
                pairs: NameValuePairs::default(),
                error: Some(reason),
            }
        }
    }

    pub fn from_error(error: &Error) -> Self {
        AdminResponse {
            status: AdminStatus::Error,
            pairs: NameValuePairs::default(),
            error: Some(error.to_string()),
        }
    }

    pub fn with_pair(
        mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Self {
        self.pairs.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push(name, value)
    }
}


//============ Tests =========================================================
