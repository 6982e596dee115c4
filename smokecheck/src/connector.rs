//! One-shot probe of the OAuth connector service: verify credentials are
//! present, obtain a client-credentials token, then look up connections for
//! a throwaway user. An unknown probe user is fine; the transport and
//! credentials are what is under test.

use crate::env::{self, EnvReport};
use serde::{Deserialize, Serialize};

pub const REQUIRED_ENV: &[&str] = &[
    "CONNECTOR_PROJECT_ID",
    "CONNECTOR_CLIENT_ID",
    "CONNECTOR_CLIENT_SECRET",
    "CONNECTOR_ENVIRONMENT",
];

#[derive(thiserror::Error, Debug)]
pub enum ConnectorError {
    #[error("missing environment variables: {0}")]
    MissingEnv(String),

    #[error("connector request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {0}")]
    TokenRejected(reqwest::StatusCode),

    #[error("token response carried no access token")]
    MalformedToken,

    #[error("connections lookup returned {0}")]
    LookupFailed(reqwest::StatusCode),
}

#[derive(Debug)]
pub struct ConnectorCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug)]
pub struct ConnectorReport {
    pub token_preview: String,
    pub connections: usize,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Deserialize)]
struct ConnectionsResponse {
    #[serde(default)]
    connections: Vec<serde_json::Value>,
}

pub struct ConnectorCheck {
    client: reqwest::Client,
    base_url: String,
}

impl ConnectorCheck {
    pub fn new(base_url: &str) -> Self {
        ConnectorCheck {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the connector credentials from the environment, failing with
    /// the full list of missing variables.
    pub fn credentials_from_env() -> Result<ConnectorCredentials, ConnectorError> {
        let report = EnvReport::collect(REQUIRED_ENV);
        if !report.is_complete() {
            return Err(ConnectorError::MissingEnv(report.missing().join(", ")));
        }

        Ok(ConnectorCredentials {
            client_id: std::env::var("CONNECTOR_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("CONNECTOR_CLIENT_SECRET").unwrap_or_default(),
        })
    }

    pub async fn obtain_token(
        &self,
        credentials: &ConnectorCredentials,
    ) -> Result<String, ConnectorError> {
        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
        };

        let response = self
            .client
            .post(format!("{}/v1/oauth/token", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::TokenRejected(status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|_| ConnectorError::MalformedToken)?;
        if token.access_token.is_empty() {
            return Err(ConnectorError::MalformedToken);
        }

        Ok(token.access_token)
    }

    /// Looks up connections for `external_user_id`. HTTP 404 counts as
    /// success with zero connections: the probe user is not expected to
    /// exist.
    pub async fn list_connections(
        &self,
        token: &str,
        external_user_id: &str,
    ) -> Result<usize, ConnectorError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/users/{external_user_id}/connections",
                self.base_url
            ))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: ConnectionsResponse = response.json().await?;
                Ok(body.connections.len())
            }
            reqwest::StatusCode::NOT_FOUND => {
                tracing::debug!(
                    user = external_user_id,
                    "probe user not found, transport and credentials verified"
                );
                Ok(0)
            }
            status => Err(ConnectorError::LookupFailed(status)),
        }
    }

    /// Full probe: env check, token grant, connections lookup.
    pub async fn run(&self, probe_user: &str) -> Result<ConnectorReport, ConnectorError> {
        let credentials = Self::credentials_from_env()?;
        let token = self.obtain_token(&credentials).await?;
        let connections = self.list_connections(&token, probe_user).await?;

        Ok(ConnectorReport {
            token_preview: env::preview(&token),
            connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Json, Path};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Router;
    use tokio::net::TcpListener;

    async fn token(Json(body): Json<serde_json::Value>) -> axum::response::Response {
        if body["client_secret"].as_str() == Some("right-secret") {
            Json(serde_json::json!({"access_token": "tok-0123456789"})).into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "bad credentials").into_response()
        }
    }

    async fn connections(Path(user): Path<String>) -> axum::response::Response {
        match user.as_str() {
            "known_user" => {
                Json(serde_json::json!({"connections": [{"app": "github"}]})).into_response()
            }
            _ => (StatusCode::NOT_FOUND, "user not found").into_response(),
        }
    }

    async fn spawn_connector() -> String {
        let app = Router::new()
            .route("/v1/oauth/token", post(token))
            .route("/v1/users/{user}/connections", get(connections));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn credentials(secret: &str) -> ConnectorCredentials {
        ConnectorCredentials {
            client_id: "client-1".into(),
            client_secret: secret.into(),
        }
    }

    #[tokio::test]
    async fn test_token_grant() {
        let base = spawn_connector().await;
        let check = ConnectorCheck::new(&base);

        let token = check.obtain_token(&credentials("right-secret")).await.unwrap();
        assert_eq!(token, "tok-0123456789");

        let err = check
            .obtain_token(&credentials("wrong-secret"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::TokenRejected(StatusCode::UNAUTHORIZED)
        ));
    }

    #[tokio::test]
    async fn test_unknown_probe_user_counts_as_success() {
        let base = spawn_connector().await;
        let check = ConnectorCheck::new(&base);
        let token = check.obtain_token(&credentials("right-secret")).await.unwrap();

        assert_eq!(
            check.list_connections(&token, "nobody_in_particular").await.unwrap(),
            0
        );
        assert_eq!(check.list_connections(&token, "known_user").await.unwrap(), 1);
    }

    #[test]
    fn test_missing_env_lists_all_variables() {
        // None of the CONNECTOR_* variables are set in the test environment.
        let err = ConnectorCheck::credentials_from_env().unwrap_err();
        match err {
            ConnectorError::MissingEnv(missing) => {
                assert!(missing.contains("CONNECTOR_CLIENT_ID"));
                assert!(missing.contains("CONNECTOR_ENVIRONMENT"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
