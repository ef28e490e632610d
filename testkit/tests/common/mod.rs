//! Common test utilities for integration tests.
//!
//! [`GreetingStartup`] is a small GraphQL app shaped like a real one: it
//! registers its own services, guards the GraphQL route with bearer-token
//! authentication and reads its salutation from the server configuration.
//!
//! ```ignore
//! let mut host = GraphQLTestHost::new(GreetingStartup);
//! let response = host.run_query("{ hello }").await?;
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::Extension, middleware, routing::post, Router};
use graphql_testkit::auth::{require_bearer_token, HmacJwt, Principal, SharedTokenValidator};
use graphql_testkit::claims::names;
use graphql_testkit::host::DEFAULT_GRAPHQL_PATH;
use graphql_testkit::telemetry::init_test_tracing;
use graphql_testkit::{GraphQLTestHost, ServiceCollection, Startup, StartupContext};

pub type GreetingSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub const DEFAULT_SALUTATION: &str = "Hello";

/// Builds greetings; tests swap it for their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeter {
    pub salutation: String,
}

impl Greeter {
    pub fn new(salutation: impl Into<String>) -> Self {
        Self {
            salutation: salutation.into(),
        }
    }

    pub fn greet(&self, name: &str) -> String {
        format!("{}, {name}!", self.salutation)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidOperation(pub String);

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn hello(&self) -> &str {
        "world"
    }

    async fn greeting(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
    ) -> async_graphql::Result<String> {
        let greeter = ctx.data::<Greeter>()?;
        Ok(greeter.greet(name.as_deref().unwrap_or("World")))
    }

    /// Subject claim of the caller.
    async fn whoami(&self, ctx: &Context<'_>) -> Option<String> {
        ctx.data_opt::<Principal>()
            .and_then(|principal| principal.0.find_first_value(names::SUBJECT))
            .map(str::to_string)
    }

    /// Claim values of the given type, in token order.
    async fn claim(&self, ctx: &Context<'_>, claim_type: String) -> Vec<String> {
        ctx.data_opt::<Principal>()
            .map(|principal| {
                principal
                    .0
                    .find_all(&claim_type)
                    .map(|claim| claim.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn fail(&self) -> async_graphql::Result<bool> {
        Err(async_graphql::Error::new_with_source(InvalidOperation(
            "Invalid operation.".to_string(),
        )))
    }
}

#[derive(Debug, serde::Deserialize)]
struct GreetingSettings {
    salutation: String,
}

/// The app under test.
pub struct GreetingStartup;

impl Startup for GreetingStartup {
    fn configure_services(&self, services: &mut ServiceCollection, context: &StartupContext) {
        let salutation = context
            .extract::<GreetingSettings>("greeting")
            .ok()
            .flatten()
            .map_or_else(|| DEFAULT_SALUTATION.to_string(), |s| s.salutation);
        services.insert(Greeter::new(salutation));

        // Production tokens are signed; the test host swaps this out.
        let validator: SharedTokenValidator =
            Arc::new(HmacJwt::new(b"production-secret", "GreetingIssuer", "GreetingAudience"));
        services.insert(validator);
    }

    fn configure(&self, _context: &StartupContext, services: &ServiceCollection) -> Router {
        let greeter = services
            .get::<Greeter>()
            .unwrap_or_else(|| Greeter::new(DEFAULT_SALUTATION));
        let schema: GreetingSchema = Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
            .data(greeter)
            .finish();

        Router::new()
            .route(DEFAULT_GRAPHQL_PATH, post(graphql_handler))
            .route_layer(middleware::from_fn(require_bearer_token))
            .layer(Extension(schema))
    }
}

async fn graphql_handler(
    Extension(schema): Extension<GreetingSchema>,
    principal: Principal,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(principal)).await.into()
}

/// A host for [`GreetingStartup`] with test logging enabled.
pub fn greeting_host() -> GraphQLTestHost<GreetingStartup> {
    init_test_tracing();
    GraphQLTestHost::new(GreetingStartup)
}
