use crate::{Result, config::AuthConfig, error};

/// How a remote provider authenticates.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Authenticator {
    #[default]
    None,
    /// Username and password (HTTP basic auth, FTP `USER`/`PASS`).
    Simple { username: String, password: String },
}

impl Authenticator {
    /// Build the authenticator for `provider` from its raw `auth` table.
    ///
    /// No table means no authentication.  The only supported method is `simple`, which needs both
    /// `username` and `password`.
    pub fn from_config(provider: &str, auth: Option<&AuthConfig>) -> Result<Self> {
        let Some(auth) = auth else {
            return Ok(Self::None);
        };

        match auth.method.as_str() {
            "none" => Ok(Self::None),
            "simple" => {
                let username = auth.username.clone().ok_or_else(|| error::Error::MissingCredential {
                    provider: provider.to_string(),
                    method: auth.method.clone(),
                    field: "username",
                })?;
                let password = auth.password.clone().ok_or_else(|| error::Error::MissingCredential {
                    provider: provider.to_string(),
                    method: auth.method.clone(),
                    field: "password",
                })?;
                Ok(Self::Simple { username, password })
            }
            other => error::UnsupportedAuthMethodSnafu {
                provider,
                method: other,
            }
            .fail(),
        }
    }
}

// Hand-written so that passwords never end up in debug logs
impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Simple { username, .. } => f
                .debug_struct("Simple")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
