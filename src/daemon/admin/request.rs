//! Admin requests and their parameters.

use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;
use crate::commons::AdminResult;
use crate::commons::error::Error;


//------------ AdminRequest --------------------------------------------------

/// The parameters of an admin request.
///
/// Parameters are kept in the order they were received. If a name appears
/// more than once, the first value wins for lookups.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AdminRequest {
    params: Vec<(String, String)>,
}

impl AdminRequest {
    /// The parameter holding the operation.
    pub const OP_TYPE: &'static str = "OP_TYPE";

    /// The parameter holding the scope of the operation.
    pub const OP_SCOPE: &'static str = "OP_SCOPE";

    /// The parameter holding the id of the resource operated on.
    pub const RS_ID: &'static str = "RS_ID";

    /// The plugin id of an instance.
    pub const IMPL_NAME: &'static str = "implName";

    /// The class reference of a plugin.
    pub const CLASS: &'static str = "class";

    const RESERVED: [&'static str; 3] = [
        Self::OP_TYPE, Self::OP_SCOPE, Self::RS_ID
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    pub fn parse_form(body: &[u8]) -> AdminResult<Self> {
        if std::str::from_utf8(body).is_err() {
            return Err(Error::ApiInvalidForm("body is not UTF-8".into()))
        }
        Ok(form_urlencoded::parse(body).into_owned().collect())
    }

    pub fn with(
        mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| {
            value.as_str()
        })
    }

    /// Returns a parameter that must be present and not empty.
    pub fn required(&self, name: &str) -> AdminResult<&str> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::MissingParameter(name.into()))
        }
    }

    /// Returns a parameter parsed into `T` if present.
    pub fn parse<T>(&self, name: &str) -> AdminResult<Option<T>>
    where T: FromStr, T::Err: fmt::Display {
        self.get(name).map(|value| {
            T::from_str(value).map_err(|err| {
                Error::invalid_parameter(name, err)
            })
        }).transpose()
    }

    pub fn op_type(&self) -> AdminResult<OpType> {
        self.required(Self::OP_TYPE)?.parse()
    }

    pub fn op_scope(&self) -> AdminResult<OpScope> {
        self.required(Self::OP_SCOPE)?.parse()
    }

    pub fn id(&self) -> AdminResult<&str> {
        self.required(Self::RS_ID)
    }

    /// Returns all parameters except the reserved ones and `skip`.
    pub fn others<'a>(
        &'a self, skip: &'a [&'a str]
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.params.iter().filter(move |(name, _)| {
            !Self::RESERVED.contains(&name.as_str())
                && !skip.contains(&name.as_str())
        }).map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| {
            (name.as_str(), value.as_str())
        })
    }

    /// Describes the request for the audit trail.
    ///
    /// Only the reserved parameters are included so that credentials never
    /// end up in the audit trail.
    pub fn summary(&self) -> String {
        format!(
            "{} {} {}",
            self.get(Self::OP_TYPE).unwrap_or("-"),
            self.get(Self::OP_SCOPE).unwrap_or("-"),
            self.get(Self::RS_ID).unwrap_or("-"),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AdminRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AdminRequest {
            params: iter.into_iter().map(|(name, value)| {
                (name.into(), value.into())
            }).collect()
        }
    }
}


//------------ OpType --------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpType {
    Read,
    Search,
    Add,
    Delete,
    Modify,
    Process,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Read => "OP_READ",
            OpType::Search => "OP_SEARCH",
            OpType::Add => "OP_ADD",
            OpType::Delete => "OP_DELETE",
            OpType::Modify => "OP_MODIFY",
            OpType::Process => "OP_PROCESS",
        }
    }

    /// Whether the operation only looks at things.
    pub fn is_read_only(self) -> bool {
        matches!(self, OpType::Read | OpType::Search)
    }
}

impl FromStr for OpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OP_READ" => Ok(OpType::Read),
            "OP_SEARCH" => Ok(OpType::Search),
            "OP_ADD" => Ok(OpType::Add),
            "OP_DELETE" => Ok(OpType::Delete),
            "OP_MODIFY" => Ok(OpType::Modify),
            "OP_PROCESS" => Ok(OpType::Process),
            _ => Err(Error::InvalidOperation(
                format!("unknown operation '{s}'")
            ))
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//------------ OpScope -------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpScope {
    /// Plugins.
    Impl,

    /// Instances.
    Instance,

    /// Settings of the subsystem itself.
    Settings,
}

impl OpScope {
    pub fn as_str(self) -> &'static str {
        match self {
            OpScope::Impl => "impl",
            OpScope::Instance => "instance",
            OpScope::Settings => "settings",
        }
    }
}

impl FromStr for OpScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impl" => Ok(OpScope::Impl),
            "instance" => Ok(OpScope::Instance),
            "settings" => Ok(OpScope::Settings),
            _ => Err(Error::InvalidOperation(format!("unknown scope '{s}'")))
        }
    }
}

impl fmt::Display for OpScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_body() {
        let request = AdminRequest::parse_form(
            b"OP_TYPE=OP_ADD&OP_SCOPE=instance&RS_ID=inst1\
              &implName=pwd&host=ldap%2F1&note=two+words"
        ).unwrap();
        assert_eq!(request.op_type().unwrap(), OpType::Add);
        assert_eq!(request.op_scope().unwrap(), OpScope::Instance);
        assert_eq!(request.id().unwrap(), "inst1");

        let others: Vec<_> = request.others(&[AdminRequest::IMPL_NAME]).collect();
        assert_eq!(others, [("host", "ldap/1"), ("note", "two words")]);
    }

    #[test]
    fn missing_and_invalid() {
        let request = AdminRequest::new()
            .with(AdminRequest::OP_TYPE, "OP_FROB")
            .with(AdminRequest::RS_ID, "")
            .with("interval", "soon");
        assert!(matches!(request.op_type(), Err(Error::InvalidOperation(_))));
        assert!(matches!(
            request.op_scope(), Err(Error::MissingParameter(name))
                if name == AdminRequest::OP_SCOPE
        ));
        assert!(matches!(request.id(), Err(Error::MissingParameter(_))));
        assert!(matches!(
            request.parse::<u64>("interval"),
            Err(Error::InvalidParameter { .. })
        ));
        assert_eq!(request.parse::<u64>("absent").unwrap(), None);
        assert!(AdminRequest::parse_form(b"a=\xff\xfe").is_err());
    }

    #[test]
    fn summary_hides_credentials() {
        let request = AdminRequest::new()
            .with(AdminRequest::OP_TYPE, "OP_PROCESS")
            .with(AdminRequest::OP_SCOPE, "instance")
            .with(AdminRequest::RS_ID, "inst1")
            .with("pwd", "secret");
        assert_eq!(request.summary(), "OP_PROCESS instance inst1");
    }
}
