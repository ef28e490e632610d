//! Should-style assertions over serialized values and GraphQL results.
//!
//! Every assertion comes in two forms: a `check_*` function returning
//! `Result<_, AssertionFailure>`, and a `should_*` method that panics with the
//! rendered failure at the caller's location.
#![allow(clippy::panic)]

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde_json::json;

use crate::canonical::{canonicalize_str, to_canonical_json, to_pretty_json};
use crate::response::ExecutionResponse;

/// What an assertion expected and what it found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Similar { expected: String, actual: String },
    Successful { actual: String },
    HasError { expected: String, actual: String },
    Serializable { error: String },
}

/// A failed assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub expectation: Expectation,
    pub custom_message: Option<String>,
}

impl AssertionFailure {
    #[must_use]
    pub const fn new(expectation: Expectation) -> Self {
        Self {
            expectation,
            custom_message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, custom_message: Option<&str>) -> Self {
        self.custom_message = custom_message.map(str::to_string);
        self
    }

    fn serialization(err: impl fmt::Display) -> Self {
        Self::new(Expectation::Serializable {
            error: err.to_string(),
        })
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expectation {
            Expectation::Similar { expected, actual } => write!(
                f,
                "value\n    should be similar to\n{expected}\n    but was\n{actual}"
            )?,
            Expectation::Successful { actual } => {
                write!(f, "result\n    should be successful but was\n{actual}")?;
            }
            Expectation::HasError { expected, actual } => write!(
                f,
                "result\n    should have error\n{expected}\n    but was\n{actual}"
            )?,
            Expectation::Serializable { error } => {
                write!(f, "value\n    should serialize to JSON but failed with\n{error}")?;
            }
        }
        if let Some(message) = &self.custom_message {
            write!(f, "\n\nAdditional Info:\n    {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssertionFailure {}

#[track_caller]
fn fail_on<T>(result: Result<T, AssertionFailure>) -> T {
    match result {
        Ok(value) => value,
        Err(failure) => panic!("{failure}"),
    }
}

/// Compare two values by their canonical JSON renderings.
///
/// # Errors
/// Returns a failure describing both renderings when they differ.
pub fn check_similar<A, E>(actual: &A, expected: &E) -> Result<(), AssertionFailure>
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    let actual = to_canonical_json(actual).map_err(AssertionFailure::serialization)?;
    let expected = to_canonical_json(expected).map_err(AssertionFailure::serialization)?;
    compare(expected, actual)
}

/// Compare a value against expected JSON text.
///
/// # Errors
/// Returns a failure when the renderings differ or the JSON text is invalid.
pub fn check_similar_to_json<A>(actual: &A, expected_json: &str) -> Result<(), AssertionFailure>
where
    A: Serialize + ?Sized,
{
    let actual = to_canonical_json(actual).map_err(AssertionFailure::serialization)?;
    let expected = canonicalize_str(expected_json).map_err(AssertionFailure::serialization)?;
    compare(expected, actual)
}

fn compare(expected: String, actual: String) -> Result<(), AssertionFailure> {
    if actual == expected {
        Ok(())
    } else {
        Err(AssertionFailure::new(Expectation::Similar { expected, actual }))
    }
}

/// Similarity assertions for any serializable value.
pub trait ShouldBeSimilar: Serialize {
    #[track_caller]
    fn should_be_similar_to<E: Serialize + ?Sized>(&self, expected: &E) {
        fail_on(check_similar(self, expected));
    }

    #[track_caller]
    fn should_be_similar_to_with<E: Serialize + ?Sized>(&self, expected: &E, custom_message: &str) {
        fail_on(check_similar(self, expected).map_err(|f| f.with_message(Some(custom_message))));
    }

    #[track_caller]
    fn should_be_similar_to_json(&self, expected_json: &str) {
        fail_on(check_similar_to_json(self, expected_json));
    }

    #[track_caller]
    fn should_be_similar_to_json_with(&self, expected_json: &str, custom_message: &str) {
        fail_on(
            check_similar_to_json(self, expected_json)
                .map_err(|f| f.with_message(Some(custom_message))),
        );
    }
}

impl<T: Serialize + ?Sized> ShouldBeSimilar for T {}

/// Assertions shared by GraphQL results, whether executed in-process or
/// received over HTTP.
pub trait GraphQLOutcome: Serialize {
    fn has_errors(&self) -> bool;

    fn has_data(&self) -> bool;

    /// Text shown as the actual value in failure messages.
    fn describe(&self) -> String;

    /// # Errors
    /// Fails when the result carries errors or has no data.
    fn check_successful(&self) -> Result<(), AssertionFailure> {
        if self.has_errors() || !self.has_data() {
            return Err(AssertionFailure::new(Expectation::Successful {
                actual: self.describe(),
            }));
        }
        Ok(())
    }

    /// # Errors
    /// Fails when the result is not similar to `{"data": data}`.
    fn check_data<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), AssertionFailure> {
        let data = serde_json::to_value(data).map_err(AssertionFailure::serialization)?;
        check_similar(self, &json!({ "data": data }))
    }

    #[track_caller]
    fn should_be_successful(&self) -> &Self {
        fail_on(self.check_successful());
        self
    }

    #[track_caller]
    fn should_be_successful_with(&self, custom_message: &str) -> &Self {
        fail_on(
            self.check_successful()
                .map_err(|f| f.with_message(Some(custom_message))),
        );
        self
    }

    #[track_caller]
    fn should_have_data<T: Serialize + ?Sized>(&self, data: &T) -> &Self {
        fail_on(self.check_data(data));
        self
    }

    #[track_caller]
    fn should_have_data_with<T: Serialize + ?Sized>(&self, data: &T, custom_message: &str) -> &Self {
        fail_on(
            self.check_data(data)
                .map_err(|f| f.with_message(Some(custom_message))),
        );
        self
    }
}

impl GraphQLOutcome for ExecutionResponse {
    fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    fn has_data(&self) -> bool {
        self.data.is_some()
    }

    fn describe(&self) -> String {
        to_canonical_json(self).unwrap_or_else(|err| format!("<unserializable: {err}>"))
    }
}

impl GraphQLOutcome for async_graphql::Response {
    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_data(&self) -> bool {
        self.data != async_graphql::Value::Null
    }

    // Execution results keep the engine's member order.
    fn describe(&self) -> String {
        to_pretty_json(self).unwrap_or_else(|err| format!("<unserializable: {err}>"))
    }
}

/// Access to the typed source of an execution error.
pub trait ShouldHaveError {
    /// Find the first error whose source is an `E`.
    ///
    /// # Errors
    /// Fails when there are no errors or none has a source of type `E`.
    fn check_error<E: Any + Send + Sync>(&self) -> Result<&E, AssertionFailure>;

    #[track_caller]
    fn should_have_error<E: Any + Send + Sync>(&self) -> &E {
        fail_on(self.check_error::<E>())
    }
}

impl ShouldHaveError for async_graphql::Response {
    fn check_error<E: Any + Send + Sync>(&self) -> Result<&E, AssertionFailure> {
        self.errors
            .iter()
            .find_map(|error| error.source::<E>())
            .ok_or_else(|| {
                AssertionFailure::new(Expectation::HasError {
                    expected: short_type_name::<E>().to_string(),
                    actual: self.describe(),
                })
            })
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
