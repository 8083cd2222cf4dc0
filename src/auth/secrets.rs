use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AuthError;

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Top-level shape of `client_secrets.json`: the registration is nested
/// under the application type.
#[derive(Deserialize)]
enum SecretsFile {
    #[serde(rename = "installed")]
    Installed(ClientSecrets),
    #[serde(rename = "web")]
    Web(ClientSecrets),
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: SecretsFile = serde_json::from_str(json)?;
        Ok(match file {
            SecretsFile::Installed(s) | SecretsFile::Web(s) => s,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AuthError::MissingClientSecrets(path.to_path_buf()),
            _ => AuthError::Io(e),
        })?;
        Self::from_json(&contents).map_err(|source| AuthError::InvalidClientSecrets {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installed_secrets() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed":{"client_id":"123.apps.googleusercontent.com","project_id":"demo",
                "auth_uri":"https://accounts.google.com/o/oauth2/auth",
                "token_uri":"https://oauth2.googleapis.com/token",
                "client_secret":"shh","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("shh"));
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URI);
    }

    #[test]
    fn test_web_secrets_default_uris() {
        let secrets = ClientSecrets::from_json(r#"{"web":{"client_id":"abc"}}"#).unwrap();
        assert_eq!(secrets.client_id, "abc");
        assert_eq!(secrets.client_secret, None);
        assert_eq!(secrets.auth_uri, GOOGLE_AUTH_URI);
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URI);
    }

    #[test]
    fn test_unknown_shape_rejected() {
        assert!(ClientSecrets::from_json(r#"{"client_id":"abc"}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("ytup_no_such_dir/client_secrets.json");
        match ClientSecrets::from_file(&path) {
            Err(AuthError::MissingClientSecrets(p)) => assert_eq!(p, path),
            other => panic!("expected MissingClientSecrets, got {other:?}"),
        }
    }
}
