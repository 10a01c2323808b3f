// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # pveha
//!
//! A declarative, idempotent manager for Proxmox VE HA resources.
//!
//! ## Overview
//!
//! pveha reconciles the HA membership of a single cluster guest (VM or
//! container) against a requested target, allowing you to:
//!
//! - Describe the desired HA configuration as command-line flags
//! - Select the guest by VMID or resolve it by name
//! - Preview the required action before applying it
//! - Apply at most one mutating API call per run
//!
//! ## Architecture
//!
//! The system is built around the concept of **desired state reconciliation**:
//!
//! 1. **Desired State**: The target built from CLI flags
//! 2. **Observed State**: The HA resource table fetched from the cluster API
//! 3. **Reconciler**: Compares both and performs the single required action
//!
//! Fields left unset on the command line are unmanaged: they never cause a
//! difference, whatever value the cluster holds for them.
//!
//! ## Modules
//!
//! - [`config`]: Connection settings and credential resolution
//! - [`api`]: Proxmox VE API client and wire types
//! - [`reconcile`]: Desired/current state model and outcome planning
//! - [`reconciler`]: Reconciliation engine
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```sh
//! pveha --api-host pve1.example.com --api-user root@pam \
//!     apply --name web-frontend --state started --group production
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{HaPayload, PveClient};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::ConnectionConfig;
pub use error::{PveHaError, Result};
pub use reconcile::{DesiredHa, HaResource, HaState, Outcome, ReconcileReport, Target, Vmid};
pub use reconciler::{GuestSelector, HaRequest, Mode, Reconciler};
