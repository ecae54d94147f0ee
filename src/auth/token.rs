use crate::commons::confstore::SubStore;
use crate::plugin::{Capability, ClassInfo};
use super::{
    AuthError, AuthManager, AuthToken, Credentials, secrets_match
};


//------------ SharedTokenAuth -----------------------------------------------

/// Accepts everyone who knows a shared secret.
#[derive(Debug, Default)]
pub struct SharedTokenAuth {
    instance_id: String,
    token: String,
    subject: String,
}

impl SharedTokenAuth {
    pub const CLASS: &'static str = "SharedTokenAuth";

    const DEFAULT_SUBJECT: &'static str = "token-user";

    pub fn class_info() -> ClassInfo {
        ClassInfo::new("Authenticates by a single shared token")
            .required("token", "the shared secret")
            .secret()
            .optional("subject", "the subject of authenticated callers")
    }
}

impl Capability for SharedTokenAuth {
    fn init(
        &mut self, instance_id: &str, _plugin_id: &str, config: &SubStore
    ) -> Result<(), String> {
        let token = config.get_string("token", "").map_err(|err| {
            err.to_string()
        })?;
        if token.is_empty() {
            return Err("missing parameter 'token'".into())
        }
        self.subject = config.get_string(
            "subject", Self::DEFAULT_SUBJECT
        ).map_err(|err| err.to_string())?;
        self.token = token;
        self.instance_id = instance_id.into();
        Ok(())
    }
}

impl AuthManager for SharedTokenAuth {
    fn required_credentials(&self) -> &[&'static str] {
        &["token"]
    }

    fn authenticate(
        &self, credentials: &Credentials
    ) -> Result<AuthToken, AuthError> {
        if secrets_match(credentials.require("token")?, &self.token) {
            Ok(AuthToken::new(self.instance_id.as_str(), self.subject.as_str()))
        }
        else {
            Err(AuthError::InvalidCredentials)
        }
    }
}


//============ Tests =========================================================
