//! In-memory test host, canonical JSON comparison and approval helpers for
//! axum GraphQL APIs.
#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

pub mod approval;
pub mod assertions;
pub mod auth;
pub mod canonical;
pub mod claims;
pub mod config;
pub mod host;
pub mod inputs;
pub mod response;
pub mod runtime;
pub mod services;
pub mod telemetry;

pub use assertions::{GraphQLOutcome, ShouldBeSimilar, ShouldHaveError};
pub use claims::{Claim, ClaimsList};
pub use config::StartupContext;
pub use gt_test_macros::graphql_test;
pub use host::{GraphQLTestHost, QueryVariables, Startup, TestHostError, TestServer};
pub use inputs::JsonStrExt;
pub use response::ExecutionResponse;
pub use services::ServiceCollection;
