//! Assertion helpers applied to in-process execution results.

mod common;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use common::{Greeter, GreetingSchema, InvalidOperation, QueryRoot};
use graphql_testkit::inputs::to_variables;
use graphql_testkit::{GraphQLOutcome, ShouldBeSimilar, ShouldHaveError};
use serde::Serialize;
use serde_json::json;

fn schema() -> GreetingSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(Greeter::new("Hello"))
        .finish()
}

#[tokio::test]
async fn test_successful_execution() {
    let response = schema().execute("{ hello }").await;

    response
        .should_be_successful()
        .should_have_data(&json!({ "hello": "world" }));
}

#[tokio::test]
async fn test_execution_with_json_variables() {
    let variables = to_variables(Some(r#"{ "name": "Grace" }"#)).expect("variables");
    let request = async_graphql::Request::new("query G($name: String) { greeting(name: $name) }")
        .variables(variables);

    let response = schema().execute(request).await;

    response.should_have_data(&json!({ "greeting": "Hello, Grace!" }));
}

#[tokio::test]
async fn test_error_source_is_typed() {
    let response = schema().execute("{ fail }").await;

    let error = response.should_have_error::<InvalidOperation>();

    assert_eq!(error, &InvalidOperation("Invalid operation.".to_string()));
    assert!(response.check_successful().is_err());
}

#[tokio::test]
async fn test_missing_error_type_reports_response() {
    let response = schema().execute("{ hello }").await;

    let failure = response
        .check_error::<InvalidOperation>()
        .expect_err("no errors");

    let text = failure.to_string();
    assert!(text.contains("should have error"));
    assert!(text.contains("InvalidOperation"));
    assert!(text.contains("\"hello\": \"world\""));
}

#[tokio::test]
#[should_panic(expected = "should be successful but was")]
async fn test_should_be_successful_panics_on_errors() {
    let response = schema().execute("{ fail }").await;
    response.should_be_successful();
}

#[derive(Serialize)]
struct Person {
    name: &'static str,
    age: u32,
    score: f64,
}

#[test]
fn test_struct_is_similar_to_json_with_other_order_and_number_form() {
    let person = Person {
        name: "Alice",
        age: 30,
        score: 2.50,
    };

    person.should_be_similar_to_json(r#"{ "score": 2.5, "age": 30, "name": "Alice" }"#);
}

#[test]
#[should_panic(expected = "Additional Info:\n    ages differ")]
fn test_similarity_failure_carries_custom_message() {
    let person = Person {
        name: "Alice",
        age: 30,
        score: 1.0,
    };

    person.should_be_similar_to_with(
        &json!({ "name": "Alice", "age": 31, "score": 1 }),
        "ages differ",
    );
}

#[test]
fn test_case_of_keys_matters_for_similarity() {
    let result = graphql_testkit::assertions::check_similar(
        &json!({ "Name": "Alice" }),
        &json!({ "name": "Alice" }),
    );
    assert!(result.is_err());
}
