//! Proxmox VE API client.
//!
//! This module provides the HTTP client for the `/api2/json` REST API.
//! Authentication uses the ticket scheme: a single `POST /access/ticket` at
//! connect time yields a `PVEAuthCookie` cookie and a `CSRFPreventionToken`
//! header value for write requests. The process is single-shot, so there is
//! no ticket refresh and no request is retried.

use reqwest::{Client, Method, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::ConnectionConfig;
use crate::error::{ApiError, PveHaError, Result};
use crate::reconcile::Vmid;

use super::types::{ClusterGuest, HaPayload, HaResourceRecord, VersionInfo, encode_sid};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Every API response wraps its body in a `data` envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
}

/// Body of a successful `POST /access/ticket`.
#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_token: String,
}

/// Authenticated Proxmox VE API client.
#[derive(Debug, Clone)]
pub struct PveClient {
    /// HTTP client.
    client: Client,
    /// Base URL up to and including `/api2/json`.
    base_url: String,
    /// Session ticket, sent as the `PVEAuthCookie` cookie.
    ticket: String,
    /// CSRF prevention token, required on write requests.
    csrf_token: String,
}

impl PveClient {
    /// Connects to a cluster and logs in with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, the cluster is
    /// unreachable, or the credentials are rejected.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        let base_url = config.api_url();
        debug!("Authenticating against {base_url}");

        let response = client
            .post(format!("{base_url}/access/ticket"))
            .form(&[
                ("username", config.user.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Login request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PveHaError::Api(ApiError::AuthenticationFailed {
                message: format!("cluster rejected credentials for {}", config.user),
            }));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PveHaError::Api(ApiError::request(status.as_u16(), body)));
        }

        let envelope: ApiEnvelope<TicketData> = response
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse ticket: {e}")))?;

        let data = envelope
            .data
            .ok_or_else(|| ApiError::invalid_response("No ticket data in login response"))?;

        Ok(Self {
            client,
            base_url,
            ticket: data.ticket,
            csrf_token: data.csrf_token,
        })
    }

    /// Fetches the cluster version.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn version(&self) -> Result<VersionInfo> {
        self.get("version").await
    }

    /// Lists guests (VMs and containers) from the cluster resource catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn cluster_guests(&self) -> Result<Vec<ClusterGuest>> {
        self.get("cluster/resources?type=vm").await
    }

    /// Lists the currently configured HA resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn ha_resources(&self) -> Result<Vec<HaResourceRecord>> {
        self.get("cluster/ha/resources").await
    }

    /// Creates a new HA resource from the full desired payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn create_ha_resource(&self, payload: &HaPayload) -> Result<()> {
        self.write(Method::POST, "cluster/ha/resources", Some(payload))
            .await
    }

    /// Updates an existing HA resource keyed by its identity.
    ///
    /// The payload must not contain the identity; it travels in the URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn update_ha_resource(&self, vmid: Vmid, payload: &HaPayload) -> Result<()> {
        let path = format!("cluster/ha/resources/{}", encode_sid(vmid));
        self.write(Method::PUT, &path, Some(payload)).await
    }

    /// Deletes an HA resource keyed by its identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn delete_ha_resource(&self, vmid: Vmid) -> Result<()> {
        let path = format!("cluster/ha/resources/{}", encode_sid(vmid));
        self.write(Method::DELETE, &path, None).await
    }

    /// Performs an authenticated GET and unwraps the data envelope.
    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        trace!("GET {path}");

        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .header(header::COOKIE, self.cookie())
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let envelope: ApiEnvelope<T> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")))?;

        envelope
            .data
            .ok_or_else(|| PveHaError::Api(ApiError::invalid_response("No data in response")))
    }

    /// Performs an authenticated write request with an optional form body.
    ///
    /// The API expects form-encoded bodies on mutating endpoints and returns
    /// an envelope whose `data` is null for these calls.
    async fn write(&self, method: Method, path: &str, body: Option<&HaPayload>) -> Result<()> {
        trace!("{method} {path}");

        let mut request = self
            .client
            .request(method, format!("{}/{path}", self.base_url))
            .header(header::COOKIE, self.cookie())
            .header("CSRFPreventionToken", &self.csrf_token);

        if let Some(body) = body {
            request = request.form(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Maps non-success statuses to API errors, passing the response through otherwise.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PveHaError::Api(ApiError::AuthenticationFailed {
                message: format!("ticket rejected ({status})"),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PveHaError::Api(ApiError::request(status.as_u16(), body)));
        }

        Ok(response)
    }

    /// Builds the `PVEAuthCookie` header value.
    fn cookie(&self) -> String {
        format!("PVEAuthCookie={}", self.ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: server_uri.to_string(),
            port: 8006,
            user: String::from("root@pam"),
            password: String::from("secret"),
            validate_certs: false,
        }
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "ticket": "PVE:root@pam:4EEC61E2::sig",
                    "CSRFPreventionToken": "4EEC61E2:token"
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_connect_logs_in() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        assert_eq!(client.csrf_token, "4EEC61E2:token");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = PveClient::connect(&test_config(&server.uri())).await;
        assert!(matches!(
            result,
            Err(PveHaError::Api(ApiError::AuthenticationFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_version_unwraps_envelope() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"version": "8.2.4", "release": "8.2", "repoid": "abc"}
            })))
            .mount(&server)
            .await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        let version = client.version().await.unwrap();
        assert_eq!(version.major(), Some(8));
    }

    #[tokio::test]
    async fn test_cluster_guests_filters_by_type() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/cluster/resources"))
            .and(query_param("type", "vm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"vmid": 100, "name": "web", "type": "qemu", "node": "pve1", "status": "running"},
                    {"vmid": 204, "name": "db", "type": "lxc", "node": "pve2", "status": "stopped"}
                ]
            })))
            .mount(&server)
            .await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        let guests = client.cluster_guests().await.unwrap();
        assert_eq!(guests.len(), 2);
        assert_eq!(guests[0].vmid, 100);
        assert_eq!(guests[1].kind, "lxc");
    }

    #[tokio::test]
    async fn test_create_posts_form_payload() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/api2/json/cluster/ha/resources"))
            .and(body_string_contains("sid=100"))
            .and(body_string_contains("state=stopped"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        let payload = HaPayload {
            sid: Some(String::from("100")),
            state: Some(String::from("stopped")),
            ..HaPayload::default()
        };
        client.create_ha_resource(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_targets_identity_path() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/api2/json/cluster/ha/resources/100"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        client.delete_ha_resource(Vmid(100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/cluster/ha/resources"))
            .respond_with(ResponseTemplate::new(500).set_body_string("cluster not healthy"))
            .mount(&server)
            .await;

        let client = PveClient::connect(&test_config(&server.uri())).await.unwrap();
        let err = client.ha_resources().await.unwrap_err();
        match err {
            PveHaError::Api(ApiError::RequestFailed { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("cluster not healthy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
