//! Client identity and HTTP Basic client authentication.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{config_error, Error};

/// OAuth client credentials registered with the provider.
#[derive(Clone)]
pub struct ClientIdentity {
    client_id: String,
    client_secret: SecretString,
}

impl ClientIdentity {
    /// Create a client identity, rejecting blank values.
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Result<Self, Error> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(config_error("OAuth client id is empty"));
        }
        if client_secret.expose_secret().trim().is_empty() {
            return Err(config_error("OAuth client secret is empty"));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the public client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `Authorization` header value for the token endpoint: `Basic base64(id:secret)`.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_basic_auth_header() {
        let identity =
            ClientIdentity::new("client", SecretString::new("secret".to_string())).unwrap();
        // base64("client:secret")
        assert_eq!(identity.basic_auth_header(), "Basic Y2xpZW50OnNlY3JldA==");
    }

    #[test]
    fn test_blank_client_id_is_config_error() {
        let result = ClientIdentity::new("  ", SecretString::new("secret".to_string()));
        assert_eq!(result.unwrap_err().error_kind, ErrorKind::Config);
    }

    #[test]
    fn test_blank_client_secret_is_config_error() {
        let result = ClientIdentity::new("client", SecretString::new(String::new()));
        assert_eq!(result.unwrap_err().error_kind, ErrorKind::Config);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let identity =
            ClientIdentity::new("client", SecretString::new("hunter2".to_string())).unwrap();
        let debug = format!("{:?}", identity);
        assert!(debug.contains("client"));
        assert!(!debug.contains("hunter2"));
    }
}
