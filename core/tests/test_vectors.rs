//! Verify wire requests and envelope parsing against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use std::sync::Arc;

use serde_json::Value;
use tienda_core::{
    ApiClient, CartEntry, CartForm, CartService, Category, CategoryForm, CategoryService, ClientConfig,
    EntityService, HttpMethod, HttpRequest, HttpResponse, ScriptedTransport, Validate,
};

const BASE_URL: &str = "http://localhost:8000";

fn scripted() -> (Arc<ScriptedTransport>, ApiClient) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = ApiClient::with_transport(ClientConfig::new(BASE_URL), transport.clone());
    (transport, client)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value, key: &str) -> HttpResponse {
    let sim = &case[key];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    if expected["body"].is_null() {
        assert!(req.body.is_none(), "{name}: body should be None");
    } else {
        assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
        let body: Value = serde_json::from_str(req.body_str().unwrap()).unwrap();
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelope.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let (_, c) = scripted();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = simulated(case, "response");

        let outcome = match case["mode"].as_str().unwrap() {
            "entity" => c
                .parse_envelope::<Category>(response)
                .and_then(|env| env.into_entity())
                .map(|category| serde_json::to_value(category).unwrap()),
            "list" => c
                .parse_envelope::<Vec<Category>>(response)
                .map(|env| serde_json::to_value(env.into_list()).unwrap()),
            other => panic!("{name}: unknown mode: {other}"),
        };

        if let Some(expected_error) = case.get("expected_error") {
            let err = outcome.unwrap_err();
            assert_eq!(err.message(), expected_error.as_str().unwrap(), "{name}: error message");
        } else {
            assert_eq!(outcome.unwrap(), case["expected_result"], "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn category_test_vectors() {
    let raw = include_str!("../../test-vectors/category.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (transport, c) = scripted();
        let service = CategoryService::new(c);
        let response = simulated(case, "simulated_response");
        transport.push_response(response.status, &response.body);

        let form = || {
            CategoryForm {
                name: case["input"]["nombreCategoria"].as_str().unwrap().to_string(),
            }
            .validate()
            .unwrap()
        };
        let id = case["id"].as_u64().unwrap_or_default();

        let result: Option<Value> = match case["operation"].as_str().unwrap() {
            "list" => Some(serde_json::to_value(service.list().await.unwrap()).unwrap()),
            "create" => Some(serde_json::to_value(service.create(&form()).await.unwrap()).unwrap()),
            "update" => Some(serde_json::to_value(service.update(id, &form()).await.unwrap()).unwrap()),
            "delete" => {
                service.delete(id).await.unwrap();
                None
            }
            other => panic!("{name}: unknown operation: {other}"),
        };

        let requests = transport.requests();
        assert_eq!(requests.len(), 1, "{name}: one request");
        assert_request(name, &requests[0], &case["expected_request"]);

        if let Some(result) = result {
            let expected = normalize::<Category>(&case["expected_result"]);
            assert_eq!(result, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_test_vectors() {
    let raw = include_str!("../../test-vectors/cart.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (transport, c) = scripted();
        let service = CartService::new(c);
        let response = simulated(case, "simulated_response");
        transport.push_response(response.status, &response.body);

        let form = || {
            CartForm {
                user_id: case["input"]["idUsuario"].as_u64().unwrap(),
                product_id: case["input"]["idProducto"].as_u64().unwrap(),
            }
            .validate()
            .unwrap()
        };
        let id = case["id"].as_u64().unwrap_or_default();

        let result: Option<Value> = match case["operation"].as_str().unwrap() {
            "list" => Some(serde_json::to_value(service.list().await.unwrap()).unwrap()),
            "create" => Some(serde_json::to_value(service.create(&form()).await.unwrap()).unwrap()),
            "update" => Some(serde_json::to_value(service.update(id, &form()).await.unwrap()).unwrap()),
            "delete" => {
                service.delete(id).await.unwrap();
                None
            }
            other => panic!("{name}: unknown operation: {other}"),
        };

        let requests = transport.requests();
        assert_eq!(requests.len(), 1, "{name}: one request");
        assert_request(name, &requests[0], &case["expected_request"]);

        if let Some(result) = result {
            let expected = normalize::<CartEntry>(&case["expected_result"]);
            assert_eq!(result, expected, "{name}: parsed result");
        }
    }
}

/// Round-trip an expected result through the entity type so optional fields
/// compare the same way on both sides. Works for one entity or a list.
fn normalize<E>(value: &Value) -> Value
where
    E: serde::de::DeserializeOwned + serde::Serialize,
{
    match value {
        Value::Array(items) => Value::Array(items.iter().map(normalize::<E>).collect()),
        other => serde_json::to_value(serde_json::from_value::<E>(other.clone()).unwrap()).unwrap(),
    }
}
