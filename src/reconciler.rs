//! Reconciler for maintaining desired HA state.
//!
//! This module implements the single-shot reconciliation run: it checks the
//! cluster capability, resolves the guest identity, fetches the current HA
//! snapshot, plans the required action and, in apply mode, performs at most
//! one mutating API call.

use tracing::{debug, info};

use crate::api::{PveClient, decode_sid};
use crate::error::{ConfigError, ReconcileError, ResolveError, Result};
use crate::reconcile::{HaResource, Outcome, ReconcileReport, Target, Vmid, plan};

/// First Proxmox VE major version carrying the current HA stack.
pub const MIN_SUPPORTED_MAJOR: u32 = 4;

/// Whether a run applies its outcome or only reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compute and report the outcome without mutating the cluster.
    Check,
    /// Compute the outcome and perform the mutating call.
    Apply,
}

/// Identifies the guest whose HA resource is being reconciled.
///
/// An explicit VMID wins; otherwise the name is resolved through the cluster
/// resource catalog.
#[derive(Debug, Clone, Default)]
pub struct GuestSelector {
    /// Explicit guest identifier.
    pub vmid: Option<u32>,
    /// Guest name to resolve.
    pub name: Option<String>,
}

/// A complete reconciliation request.
#[derive(Debug, Clone)]
pub struct HaRequest {
    /// Guest selection.
    pub selector: GuestSelector,
    /// Requested target, with the `present` alias already resolved.
    pub target: Target,
}

/// Reconciler for one cluster connection.
#[derive(Debug)]
pub struct Reconciler<'a> {
    /// Authenticated API client.
    client: &'a PveClient,
    /// Run mode.
    mode: Mode,
}

impl<'a> Reconciler<'a> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(client: &'a PveClient, mode: Mode) -> Self {
        Self { client, mode }
    }

    /// Performs one reconciliation run.
    ///
    /// The mutating call is always the last fallible step, so an error
    /// implies the cluster was not modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster version is unsupported, the identity
    /// cannot be resolved, the snapshot fetch fails, or the mutating call
    /// fails.
    pub async fn run(&self, request: &HaRequest) -> Result<ReconcileReport> {
        self.ensure_supported_version().await?;

        let vmid = self.resolve_vmid(&request.selector).await?;
        info!("Reconciling HA resource for guest {vmid}");

        let current = self.fetch_current(vmid).await?;
        debug!("Current snapshot: {current:?}");

        let outcome = plan(vmid, &request.target, current.as_ref());

        if self.mode == Mode::Apply {
            self.apply(&outcome).await?;
        } else if outcome.is_change() {
            info!("Check mode: {} not applied", describe(&outcome));
        }

        Ok(ReconcileReport::from_outcome(
            &outcome,
            self.mode == Mode::Check,
        ))
    }

    /// Resolves the guest identity and fetches its normalized snapshot.
    ///
    /// Used by the status command; performs the same prechecks as a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the version precheck, the identity resolution or
    /// the snapshot fetch fails.
    pub async fn current(&self, selector: &GuestSelector) -> Result<(Vmid, Option<HaResource>)> {
        self.ensure_supported_version().await?;
        let vmid = self.resolve_vmid(selector).await?;
        let current = self.fetch_current(vmid).await?;
        Ok((vmid, current))
    }

    /// Rejects clusters that predate the current HA stack.
    async fn ensure_supported_version(&self) -> Result<()> {
        let version = self.client.version().await?;
        let major = version.major().ok_or_else(|| {
            crate::error::ApiError::invalid_response(format!(
                "Unparseable cluster version '{}'",
                version.version
            ))
        })?;

        debug!("Cluster reports PVE major version {major}");

        if major < MIN_SUPPORTED_MAJOR {
            return Err(ReconcileError::UnsupportedVersion {
                version: major,
                minimum: MIN_SUPPORTED_MAJOR,
            }
            .into());
        }

        Ok(())
    }

    /// Resolves the selector to a bare VMID.
    async fn resolve_vmid(&self, selector: &GuestSelector) -> Result<Vmid> {
        if let Some(vmid) = selector.vmid {
            return Ok(Vmid(vmid));
        }

        let Some(name) = selector.name.as_deref() else {
            return Err(ConfigError::MissingIdentity.into());
        };

        debug!("Resolving guest name '{name}'");

        let guests = self
            .client
            .cluster_guests()
            .await
            .map_err(|e| ResolveError::LookupFailed {
                message: e.to_string(),
            })?;

        let matches: Vec<u32> = guests
            .iter()
            .filter(|g| g.name.as_deref() == Some(name))
            .map(|g| g.vmid)
            .collect();

        match matches.as_slice() {
            [] => Err(ResolveError::NameNotFound {
                name: name.to_string(),
            }
            .into()),
            [vmid] => Ok(Vmid(*vmid)),
            many => Err(ResolveError::AmbiguousName {
                name: name.to_string(),
                matches: many.len(),
            }
            .into()),
        }
    }

    /// Fetches and normalizes the guest's HA resource, if one exists.
    async fn fetch_current(&self, vmid: Vmid) -> Result<Option<HaResource>> {
        let records = self
            .client
            .ha_resources()
            .await
            .map_err(ReconcileError::fetch)?;

        Ok(records
            .iter()
            .find(|r| decode_sid(&r.sid) == Some(vmid))
            .and_then(HaResource::from_record))
    }

    /// Performs the single mutating call of the run.
    async fn apply(&self, outcome: &Outcome) -> Result<()> {
        match outcome {
            Outcome::NoOp { .. } => Ok(()),
            Outcome::Create { vmid, payload } => {
                info!("Adding HA resource {vmid}");
                self.client
                    .create_ha_resource(payload)
                    .await
                    .map_err(|e| ReconcileError::mutation("add", vmid.0, e))?;
                Ok(())
            }
            Outcome::Update { vmid, payload, .. } => {
                info!("Changing HA resource {vmid}");
                self.client
                    .update_ha_resource(*vmid, payload)
                    .await
                    .map_err(|e| ReconcileError::mutation("change", vmid.0, e))?;
                Ok(())
            }
            Outcome::Delete { vmid, .. } => {
                info!("Removing HA resource {vmid}");
                self.client
                    .delete_ha_resource(*vmid)
                    .await
                    .map_err(|e| ReconcileError::mutation("remove", vmid.0, e))?;
                Ok(())
            }
        }
    }
}

/// Short action word for log lines.
const fn describe(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::NoOp { .. } => "no-op",
        Outcome::Create { .. } => "create",
        Outcome::Update { .. } => "update",
        Outcome::Delete { .. } => "delete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::error::PveHaError;
    use crate::reconcile::{DesiredHa, HaState};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connected_client(server: &MockServer) -> PveClient {
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

        let config = ConnectionConfig {
            host: server.uri(),
            port: 8006,
            user: String::from("root@pam"),
            password: String::from("secret"),
            validate_certs: false,
        };
        PveClient::connect(&config).await.unwrap()
    }

    async fn mount_version(server: &MockServer, version: &str) {
        Mock::given(method("GET"))
            .and(path("/api2/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"version": version}
            })))
            .mount(server)
            .await;
    }

    async fn mount_ha_resources(server: &MockServer, data: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api2/json/cluster/ha/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": data
            })))
            .mount(server)
            .await;
    }

    fn started_request(vmid: u32) -> HaRequest {
        HaRequest {
            selector: GuestSelector {
                vmid: Some(vmid),
                name: None,
            },
            target: Target::Configure(DesiredHa::default()),
        }
    }

    #[tokio::test]
    async fn test_old_cluster_is_rejected_before_any_resource_call() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "3.4").await;

        let reconciler = Reconciler::new(&client, Mode::Apply);
        let err = reconciler.run(&started_request(100)).await.unwrap_err();

        assert!(matches!(
            err,
            PveHaError::Reconcile(ReconcileError::UnsupportedVersion { version: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_check_mode_never_mutates() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;
        mount_ha_resources(&server, serde_json::json!([])).await;

        let reconciler = Reconciler::new(&client, Mode::Check);
        let report = reconciler.run(&started_request(100)).await.unwrap();

        // The outcome matches what apply would produce.
        assert!(report.changed);
        assert!(report.check_mode);

        // Beyond the login, no POST/PUT/DELETE was issued.
        let mutations = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.method != wiremock::http::Method::GET)
            .filter(|r| !r.url.path().ends_with("/access/ticket"))
            .count();
        assert_eq!(mutations, 0);
    }

    #[tokio::test]
    async fn test_apply_creates_missing_resource() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;
        mount_ha_resources(&server, serde_json::json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api2/json/cluster/ha/resources"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reconciler = Reconciler::new(&client, Mode::Apply);
        let report = reconciler.run(&started_request(100)).await.unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Added resource 100");
    }

    #[tokio::test]
    async fn test_converged_resource_is_a_noop() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;
        // Server-implied defaults are elided against a desired {started}.
        mount_ha_resources(
            &server,
            serde_json::json!([{"sid": "vm:100", "type": "vm", "digest": "abc"}]),
        )
        .await;

        let reconciler = Reconciler::new(&client, Mode::Apply);
        let report = reconciler.run(&started_request(100)).await.unwrap();

        assert!(!report.changed);
    }

    #[tokio::test]
    async fn test_apply_removes_existing_resource() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;
        mount_ha_resources(
            &server,
            serde_json::json!([{"sid": "vm:100", "state": "started", "type": "vm"}]),
        )
        .await;
        Mock::given(method("DELETE"))
            .and(path("/api2/json/cluster/ha/resources/100"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = HaRequest {
            selector: GuestSelector {
                vmid: Some(100),
                name: None,
            },
            target: Target::Absent,
        };

        let reconciler = Reconciler::new(&client, Mode::Apply);
        let report = reconciler.run(&request).await.unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Resource 100 removed");
    }

    #[tokio::test]
    async fn test_name_resolution() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;
        Mock::given(method("GET"))
            .and(path("/api2/json/cluster/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"vmid": 100, "name": "web", "type": "qemu"},
                    {"vmid": 101, "name": "twin", "type": "qemu"},
                    {"vmid": 102, "name": "twin", "type": "lxc"}
                ]
            })))
            .mount(&server)
            .await;

        let reconciler = Reconciler::new(&client, Mode::Check);

        let selector = |name: &str| GuestSelector {
            vmid: None,
            name: Some(name.to_string()),
        };

        let err = reconciler.resolve_vmid(&selector("missing")).await.unwrap_err();
        assert!(matches!(
            err,
            PveHaError::Resolve(ResolveError::NameNotFound { .. })
        ));

        let err = reconciler.resolve_vmid(&selector("twin")).await.unwrap_err();
        assert!(matches!(
            err,
            PveHaError::Resolve(ResolveError::AmbiguousName { matches: 2, .. })
        ));

        let vmid = reconciler.resolve_vmid(&selector("web")).await.unwrap();
        assert_eq!(vmid, Vmid(100));
    }

    #[tokio::test]
    async fn test_missing_identity_is_a_config_error() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        mount_version(&server, "8.2.4").await;

        let request = HaRequest {
            selector: GuestSelector::default(),
            target: Target::Configure(DesiredHa {
                state: HaState::Started,
                ..DesiredHa::default()
            }),
        };

        let reconciler = Reconciler::new(&client, Mode::Check);
        let err = reconciler.run(&request).await.unwrap_err();
        assert!(matches!(
            err,
            PveHaError::Config(ConfigError::MissingIdentity)
        ));
    }
}
