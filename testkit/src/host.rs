//! In-memory test host for GraphQL applications.
//!
//! [`GraphQLTestHost`] wires an application described by a [`Startup`] into a
//! router that is driven in-process with `tower::ServiceExt::oneshot`, then
//! sends authenticated GraphQL requests to it.
//!
//! # Usage
//!
//! ```ignore
//! let mut host = GraphQLTestHost::new(MyStartup);
//! host.services_mut()?.insert(MockRepo::default());
//!
//! let response = host.run_query("{ hello }").await?;
//! response.should_be_successful();
//! ```
//!
//! The app is built lazily on the first query or service lookup. From then
//! on services can no longer be registered.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::{
    configure_unsigned_jwt_bearer_tokens, AccessTokenIssuer, AuthError, UnsignedJwtIssuer,
};
use crate::claims::{names, ClaimsList};
use crate::config::{default_config_dir, load_server_config, ConfigError, StartupContext};
use crate::response::ExecutionResponse;
use crate::services::ServiceCollection;

/// Path of the GraphQL endpoint unless overridden.
pub const DEFAULT_GRAPHQL_PATH: &str = "/api/graphql";

/// Audience claim every new host starts with.
pub const DEFAULT_AUDIENCE: &str = "TestAudience";

/// Issuer claim every new host starts with.
pub const DEFAULT_ISSUER: &str = "TestIssuer";

/// Largest response body the host will read.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TestHostError {
    #[error("Cannot configure services after the host has started")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create access token: {0}")]
    Token(#[from] AuthError),

    #[error("Invalid variables: {0}")]
    Variables(#[source] serde_json::Error),

    #[error("Failed to build request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("Failed to read response body: {0}")]
    Body(#[source] axum::Error),

    #[error("GraphQL request failed with status code {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Null was received from GraphQL server")]
    NullResponse,

    #[error("Invalid GraphQL response body: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

/// The application under test.
pub trait Startup: Send + Sync {
    /// Register the application's own services.
    ///
    /// Test overrides and the unsigned token validator are applied afterwards
    /// and replace anything registered here.
    fn configure_services(&self, _services: &mut ServiceCollection, _context: &StartupContext) {}

    /// Build the application's routes.
    ///
    /// Every service is layered onto the returned router as an extension.
    fn configure(&self, context: &StartupContext, services: &ServiceCollection) -> Router;
}

impl<F> Startup for F
where
    F: Fn(&StartupContext, &ServiceCollection) -> Router + Send + Sync,
{
    fn configure(&self, context: &StartupContext, services: &ServiceCollection) -> Router {
        self(context, services)
    }
}

/// Variables sent with a GraphQL request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryVariables {
    #[default]
    None,
    /// JSON text, parsed before sending.
    Json(String),
    Value(Value),
}

impl QueryVariables {
    /// Variables from any serializable value.
    ///
    /// # Errors
    /// Returns an error if the value cannot be represented as JSON.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Value)
    }

    fn into_value(self) -> Result<Value, TestHostError> {
        match self {
            Self::None => Ok(Value::Null),
            Self::Json(text) => serde_json::from_str(&text).map_err(TestHostError::Variables),
            Self::Value(value) => Ok(value),
        }
    }
}

impl From<&str> for QueryVariables {
    fn from(json: &str) -> Self {
        Self::Json(json.to_string())
    }
}

impl From<String> for QueryVariables {
    fn from(json: String) -> Self {
        Self::Json(json)
    }
}

impl From<Value> for QueryVariables {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for QueryVariables {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::None, Self::Value)
    }
}

/// An application router driven in-process.
#[derive(Debug, Clone)]
pub struct TestServer {
    router: Router,
}

impl TestServer {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request through the app without a network socket.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {})
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}

struct Started {
    server: TestServer,
    services: ServiceCollection,
}

/// Test host sending authenticated GraphQL requests to an in-memory app.
pub struct GraphQLTestHost<S> {
    startup: S,
    claims: ClaimsList,
    test_services: ServiceCollection,
    graphql_path: String,
    config_dir: Option<PathBuf>,
    token_issuer: Arc<dyn AccessTokenIssuer>,
    started: Option<Started>,
}

impl<S: Startup> GraphQLTestHost<S> {
    /// Create a host whose claims hold the default audience and issuer.
    pub fn new(startup: S) -> Self {
        let mut claims = ClaimsList::new();
        claims.set(names::AUDIENCE, DEFAULT_AUDIENCE);
        claims.set(names::ISSUER, DEFAULT_ISSUER);

        Self {
            startup,
            claims,
            test_services: ServiceCollection::new(),
            graphql_path: DEFAULT_GRAPHQL_PATH.to_string(),
            config_dir: None,
            token_issuer: Arc::new(UnsignedJwtIssuer::default()),
            started: None,
        }
    }

    /// Send requests to a different GraphQL path.
    #[must_use]
    pub fn with_graphql_path(mut self, path: impl Into<String>) -> Self {
        self.graphql_path = path.into();
        self
    }

    /// Issue access tokens with a custom issuer.
    #[must_use]
    pub fn with_token_issuer(mut self, issuer: impl AccessTokenIssuer + 'static) -> Self {
        self.token_issuer = Arc::new(issuer);
        self
    }

    /// Look for the server configuration file in `dir`.
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn graphql_path(&self) -> &str {
        &self.graphql_path
    }

    /// Claims used to build the access token.
    ///
    /// With no claims, requests carry no `Authorization` header.
    #[must_use]
    pub const fn claims(&self) -> &ClaimsList {
        &self.claims
    }

    pub fn claims_mut(&mut self) -> &mut ClaimsList {
        &mut self.claims
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Services that override the application's own registrations.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` once the app has been built.
    pub fn services_mut(&mut self) -> Result<&mut ServiceCollection, TestHostError> {
        if self.started.is_some() {
            return Err(TestHostError::AlreadyStarted);
        }
        Ok(&mut self.test_services)
    }

    /// Use a prebuilt router instead of building one from the startup.
    ///
    /// The router is used as given; no services are layered onto it.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` once the app has been built.
    pub fn set_app(&mut self, router: Router) -> Result<(), TestHostError> {
        if self.started.is_some() {
            return Err(TestHostError::AlreadyStarted);
        }
        self.started = Some(Started {
            server: TestServer::new(router),
            services: ServiceCollection::new(),
        });
        Ok(())
    }

    /// Build the app if it has not been built yet.
    ///
    /// # Errors
    /// Returns an error if the server configuration cannot be loaded.
    pub fn start(&mut self) -> Result<&TestServer, TestHostError> {
        let started = match self.started.take() {
            Some(started) => started,
            None => self.build()?,
        };
        Ok(&self.started.insert(started).server)
    }

    fn build(&self) -> Result<Started, TestHostError> {
        let config_dir = self.config_dir.clone().unwrap_or_else(default_config_dir);
        let context = StartupContext::new(load_server_config(&config_dir)?);

        let mut services = ServiceCollection::new();
        self.startup.configure_services(&mut services, &context);
        configure_unsigned_jwt_bearer_tokens(&mut services);
        services.merge(&self.test_services);

        let router = services.apply(self.startup.configure(&context, &services));

        tracing::info!(
            environment = %context.environment_name,
            graphql_path = %self.graphql_path,
            services = services.len(),
            has_config = context.config.is_some(),
            "Test host started"
        );

        Ok(Started {
            server: TestServer::new(router),
            services,
        })
    }

    /// The in-memory server, starting the host if needed.
    ///
    /// # Errors
    /// Returns an error if the host cannot start.
    pub fn app(&mut self) -> Result<TestServer, TestHostError> {
        self.start().cloned()
    }

    /// Resolve a service from the running app, starting the host if needed.
    ///
    /// # Errors
    /// Returns an error if the host cannot start.
    pub fn service<T: Clone + Send + Sync + 'static>(&mut self) -> Result<Option<T>, TestHostError> {
        self.start()?;
        Ok(self
            .started
            .as_ref()
            .and_then(|started| started.services.get::<T>()))
    }

    /// Access token for the current claims.
    ///
    /// # Errors
    /// Returns an error if the issuer cannot build a token.
    pub fn access_token(&self) -> Result<String, TestHostError> {
        Ok(self.token_issuer.issue(&self.claims)?)
    }

    /// Run a query without variables.
    ///
    /// # Errors
    /// See [`GraphQLTestHost::run_query_with`].
    pub async fn run_query(&mut self, query: &str) -> Result<ExecutionResponse, TestHostError> {
        self.run_query_with(query, QueryVariables::None).await
    }

    /// Run a query and return the parsed response with its HTTP status.
    ///
    /// The request is a JSON `POST`, which keeps CSRF protections that only
    /// apply to simple requests out of the way.
    ///
    /// # Errors
    /// Returns an error if the host cannot start, the variables are invalid,
    /// the status is neither 200 nor 400, or the body is `null` or not a
    /// GraphQL response.
    pub async fn run_query_with(
        &mut self,
        query: &str,
        variables: impl Into<QueryVariables>,
    ) -> Result<ExecutionResponse, TestHostError> {
        let server = self.app()?;
        let variables: QueryVariables = variables.into();

        let body = json!({
            "query": query,
            "variables": variables.into_value()?,
        });

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(self.graphql_path.as_str())
            .header(CONTENT_TYPE, "application/json");
        if !self.claims.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.access_token()?));
        }
        let request = request.body(Body::from(body.to_string()))?;

        tracing::debug!(path = %self.graphql_path, "Sending GraphQL request");
        let response = server.send(request).await;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::BAD_REQUEST {
            tracing::warn!(%status, "GraphQL request failed");
            return Err(TestHostError::UnexpectedStatus(status));
        }

        let bytes = to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .map_err(TestHostError::Body)?;
        let mut parsed = serde_json::from_slice::<Option<ExecutionResponse>>(&bytes)
            .map_err(TestHostError::InvalidResponse)?
            .ok_or(TestHostError::NullResponse)?;
        parsed.status = status;
        Ok(parsed)
    }
}
