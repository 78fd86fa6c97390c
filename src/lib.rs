//! refgate: a policy-checked HTTP API for creating, moving and deleting git references
//!
//! Every mutation runs the same pipeline:
//!
//! 1. the reference name is validated ([`policy::ReferenceName`])
//! 2. the target commit-ish is resolved to an object id
//! 3. the acting [`policy::Principal`] is authorized against protected tag and
//!    branch rules ([`policy::authorize`]); rule lookups that fail deny
//! 4. the reference is written with a compare-and-swap on its previous value
//!    ([`git::RefStore`])
//!
//! Reference records are rendered in the Gitea/GitHub `git/refs` format.
//!
//! ## Usage
//!
//! - As an HTTP server: `refgate serve --repositories-root /srv/git`
//! - From the command line against one repository: `refgate-cli list-refs --repository .`
//! - Directly as a Rust library through [`services`]

pub mod api;
pub mod config;
pub mod error;
pub mod git;
pub mod policy;
pub mod services;
pub mod transport;
