//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::reconcile::{DesiredHa, HaState, Target};
use crate::reconciler::{GuestSelector, HaRequest};

/// pveha - Declarative Proxmox VE HA resource manager.
#[derive(Parser, Debug)]
#[command(name = "pveha")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Cluster connection parameters.
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection parameters for the cluster API.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Hostname or address of a cluster node, or a full base URL.
    #[arg(long, env = "PROXMOX_HOST")]
    pub api_host: String,

    /// API user, e.g. root@pam.
    #[arg(long, env = "PROXMOX_USER")]
    pub api_user: String,

    /// API password. Falls back to the PROXMOX_PASSWORD environment variable.
    #[arg(long)]
    pub api_password: Option<String>,

    /// API port.
    #[arg(long, default_value_t = 8006)]
    pub api_port: u16,

    /// Verify the cluster's TLS certificate.
    #[arg(long)]
    pub validate_certs: bool,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the required action without mutating the cluster.
    Plan {
        /// Desired HA resource.
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Reconcile the HA resource, performing at most one mutating call.
    Apply {
        /// Desired HA resource.
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Show the current HA configuration of a guest.
    Status {
        /// Guest selection.
        #[command(flatten)]
        guest: GuestArgs,
    },
}

/// Guest selection arguments.
#[derive(Args, Debug)]
pub struct GuestArgs {
    /// Guest name; the VMID is resolved through the cluster resource catalog.
    #[arg(long)]
    pub name: Option<String>,

    /// Guest VMID. Takes precedence over --name.
    #[arg(long)]
    pub vmid: Option<u32>,
}

/// Desired HA resource arguments.
#[derive(Args, Debug)]
pub struct ResourceArgs {
    /// Guest selection.
    #[command(flatten)]
    pub guest: GuestArgs,

    /// Requested target state.
    #[arg(long, value_enum, default_value_t = TargetStateArg::Started)]
    pub state: TargetStateArg,

    /// Comment attached to the HA resource, for documentation only.
    #[arg(long)]
    pub comment: Option<String>,

    /// Expected SHA1 digest of the current configuration, to prevent
    /// concurrent modifications.
    #[arg(long)]
    pub digest: Option<String>,

    /// HA group the guest should be a member of.
    #[arg(long)]
    pub group: Option<String>,

    /// Maximum relocate attempts before the service counts as failed.
    #[arg(long)]
    pub max_relocate: Option<u32>,

    /// Maximum restart attempts before the service counts as failed.
    #[arg(long)]
    pub max_restart: Option<u32>,
}

/// Requested target state, including the aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetStateArg {
    /// Alias for started.
    Present,
    /// Remove the HA resource if present.
    Absent,
    /// Configure the resource and request the started state.
    Started,
    /// Configure the resource and request the stopped state.
    Stopped,
    /// Configure the resource and request the disabled state.
    Disabled,
    /// Configure the resource and request the ignored state.
    Ignored,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl GuestArgs {
    /// Converts to a guest selector.
    #[must_use]
    pub fn selector(&self) -> GuestSelector {
        GuestSelector {
            vmid: self.vmid,
            name: self.name.clone(),
        }
    }
}

impl ResourceArgs {
    /// Builds the reconciliation request, resolving the `present` alias.
    #[must_use]
    pub fn to_request(&self) -> HaRequest {
        let target = match self.state {
            TargetStateArg::Absent => Target::Absent,
            state => Target::Configure(DesiredHa {
                state: match state {
                    TargetStateArg::Present | TargetStateArg::Started => HaState::Started,
                    TargetStateArg::Stopped => HaState::Stopped,
                    TargetStateArg::Disabled => HaState::Disabled,
                    TargetStateArg::Ignored => HaState::Ignored,
                    TargetStateArg::Absent => unreachable!(),
                },
                comment: self.comment.clone(),
                digest: self.digest.clone(),
                group: self.group.clone(),
                max_restart: self.max_restart,
                max_relocate: self.max_relocate,
            }),
        };

        HaRequest {
            selector: self.guest.selector(),
            target,
        }
    }
}
