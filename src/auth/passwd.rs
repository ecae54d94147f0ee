//! Authentication against configured user names and password hashes.

use log::trace;
use crate::commons::confstore::SubStore;
use crate::constants::{PW_HASH_LOG_N, PW_HASH_P, PW_HASH_R};
use crate::plugin::{Capability, ClassInfo};
use super::{
    AuthError, AuthManager, AuthToken, Credentials, secrets_match
};


//------------ PasswdAuth ----------------------------------------------------

/// Checks a user id and password against the instance configuration.
///
/// Every parameter `user_<uid>` configures a user. Its value is the hex
/// encoded scrypt hash of the password salted with the instance `salt`
/// parameter, as produced by [`PasswdAuth::hash_password`].
#[derive(Debug, Default)]
pub struct PasswdAuth {
    instance_id: String,
    salt: Vec<u8>,
    users: Vec<(String, String)>,
    fake_password_hash: String,
}

impl PasswdAuth {
    pub const CLASS: &'static str = "PasswdAuth";

    pub const USER_PREFIX: &'static str = "user_";

    pub fn class_info() -> ClassInfo {
        ClassInfo::new("Authenticates users by id and password")
            .required("salt", "hex encoded salt used for all password hashes")
            .secret()
            .optional(
                "user_<uid>",
                "hex encoded scrypt hash of the password of user <uid>"
            )
            .secret()
    }

    /// Hashes a password the way it needs to appear in the configuration.
    pub fn hash_password(
        password: &str, salt: &[u8]
    ) -> Result<String, String> {
        let params = scrypt::Params::new(
            PW_HASH_LOG_N,
            PW_HASH_R,
            PW_HASH_P,
            scrypt::Params::RECOMMENDED_LEN,
        ).map_err(|err| err.to_string())?;
        let mut hash = [0u8; 32];
        scrypt::scrypt(
            password.trim().as_bytes(), salt, &params, &mut hash
        ).map_err(|err| err.to_string())?;
        Ok(hex::encode(hash))
    }
}

impl Capability for PasswdAuth {
    fn init(
        &mut self, instance_id: &str, _plugin_id: &str, config: &SubStore
    ) -> Result<(), String> {
        let salt = config.get("salt").map_err(|err| err.to_string())?
            .ok_or("missing parameter 'salt'")?;
        self.salt = hex::decode(&salt).map_err(|err| {
            format!("invalid salt: {err}")
        })?;
        if self.salt.is_empty() {
            return Err("empty salt".into())
        }

        self.users.clear();
        for (key, value) in config.values() {
            let Some(uid) = key.strip_prefix(Self::USER_PREFIX) else {
                continue
            };
            if uid.is_empty() {
                return Err(format!("empty user id in '{key}'"))
            }
            if hex::decode(&value).map(|hash| hash.len()) != Ok(32) {
                return Err(format!("invalid password hash for user '{uid}'"))
            }
            self.users.push((uid.into(), value.to_ascii_lowercase()));
        }
        self.instance_id = instance_id.into();
        self.fake_password_hash = hex::encode([0u8; 32]);
        Ok(())
    }
}

impl AuthManager for PasswdAuth {
    fn required_credentials(&self) -> &[&'static str] {
        &["uid", "pwd"]
    }

    fn authenticate(
        &self, credentials: &Credentials
    ) -> Result<AuthToken, AuthError> {
        let uid = credentials.require("uid")?.trim();
        let pwd = credentials.require("pwd")?;

        // Unknown users cost the same work as known ones so that timing
        // doesn't tell which user ids exist.
        let known = self.users.iter().find(|(name, _)| name == uid);
        let expected = match known {
            Some((_, hash)) => hash.as_str(),
            None => self.fake_password_hash.as_str(),
        };
        let hash = Self::hash_password(pwd, &self.salt).map_err(
            AuthError::Internal
        )?;

        if !secrets_match(&hash, expected) || known.is_none() {
            trace!("Failed password authentication for '{uid}'");
            return Err(AuthError::InvalidCredentials)
        }
        Ok(
            AuthToken::new(self.instance_id.as_str(), uid)
                .with_attribute("uid", uid)
        )
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::confstore::ConfigStore;

    const SALT: &str = "0a1b2c3d4e5f";

    fn manager() -> PasswdAuth {
        let config = ConfigStore::memory().root();
        config.put("salt", SALT).unwrap();
        config.put(
            "user_alice",
            PasswdAuth::hash_password(
                "wonderland", &hex::decode(SALT).unwrap()
            ).unwrap()
        ).unwrap();
        config.put("host", "ignored").unwrap();
        let mut manager = PasswdAuth::default();
        manager.init("pw1", "pwd", &config).unwrap();
        manager
    }

    #[test]
    fn authenticate_known_user() {
        let manager = manager();
        let token = manager.authenticate(
            &Credentials::new().with("uid", "alice").with("pwd", "wonderland")
        ).unwrap();
        assert_eq!(token.manager, "pw1");
        assert_eq!(token.subject, "alice");
        assert_eq!(
            token.attributes, vec![("uid".to_string(), "alice".to_string())]
        );
    }

    #[test]
    fn reject_wrong_password_and_unknown_user() {
        let manager = manager();
        assert_eq!(
            manager.authenticate(
                &Credentials::new().with("uid", "alice").with("pwd", "x")
            ),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.authenticate(
                &Credentials::new().with("uid", "bob").with("pwd", "x")
            ),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.authenticate(&Credentials::new().with("uid", "alice")),
            Err(AuthError::MissingCredential("pwd".into()))
        );
    }

    #[test]
    fn init_checks_config() {
        let config = ConfigStore::memory().root();
        let mut manager = PasswdAuth::default();
        assert!(manager.init("pw1", "pwd", &config).is_err());

        config.put("salt", "not hex").unwrap();
        assert!(manager.init("pw1", "pwd", &config).is_err());

        config.put("salt", SALT).unwrap();
        config.put("user_bob", "abcd").unwrap();
        assert!(manager.init("pw1", "pwd", &config).is_err());
    }
}
