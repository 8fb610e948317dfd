use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = almox_api::app::build_app().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn seed_user(client: &reqwest::Client, base_url: &str) -> String {
    let res = client
        .post(format!("{}/users", base_url))
        .json(&json!({ "name": "Bruna", "sector_name": "Warehouse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn seed_product(client: &reqwest::Client, base_url: &str, quantity: i64) -> String {
    let res = client
        .post(format!("{}/products", base_url))
        .json(&json!({
            "name": "Thermal paper roll",
            "category_name": "Office supplies",
            "quantity": quantity,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn product_quantity(client: &reqwest::Client, base_url: &str, product_id: &str) -> i64 {
    let res = client
        .get(format!("{}/products/{}", base_url, product_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json::<serde_json::Value>().await.unwrap()["quantity"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn request_lifecycle_end_to_end() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let user_id = seed_user(&client, &server.base_url).await;
    let product_id = seed_product(&client, &server.base_url, 10).await;
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 10);

    // Create a request: stock is debited.
    let res = client
        .post(format!("{}/requests", server.base_url))
        .json(&json!({ "user_id": user_id, "product_id": product_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let entry: serde_json::Value = res.json().await.unwrap();
    let request_id = entry["id"].as_str().unwrap().to_string();
    assert_eq!(entry["delivered"], json!(false));
    assert_eq!(entry["delivered_at"], json!(null));
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 7);

    // The listing joins reference data.
    let res = client
        .get(format!("{}/requests", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["user_name"], json!("Bruna"));
    assert_eq!(listed[0]["user_sector"]["name"], json!("Warehouse"));
    assert_eq!(listed[0]["product_name"], json!("Thermal paper roll"));
    assert_eq!(listed[0]["category_name"], json!("Office supplies"));

    // Update applies the delta.
    let res = client
        .put(format!("{}/requests/{}", server.base_url, request_id))
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 5);

    // Updating past availability is rejected without side effects.
    let res = client
        .put(format!("{}/requests/{}", server.base_url, request_id))
        .json(&json!({ "quantity": 99 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("insufficient_stock"));
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 5);

    // Deliver, then re-delivering is an invalid transition.
    let res = client
        .put(format!("{}/requests/{}/deliver", server.base_url, request_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered: serde_json::Value = res.json().await.unwrap();
    assert_eq!(delivered["delivered"], json!(true));
    assert!(delivered["delivered_at"].is_string());

    let res = client
        .put(format!("{}/requests/{}/deliver", server.base_url, request_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Cancel delivery, then cancelling again is invalid.
    let res = client
        .put(format!(
            "{}/requests/{}/cancel-delivery",
            server.base_url, request_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled: serde_json::Value = res.json().await.unwrap();
    assert_eq!(cancelled["delivered"], json!(false));
    assert_eq!(cancelled["delivered_at"], json!(null));

    let res = client
        .put(format!(
            "{}/requests/{}/cancel-delivery",
            server.base_url, request_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("invalid_state"));

    // Delete restores the pool.
    let res = client
        .delete(format!("{}/requests/{}", server.base_url, request_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 10);

    let res = client
        .get(format!("{}/requests/{}", server.base_url, request_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_validates_references_and_stock() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user_id = seed_user(&client, &server.base_url).await;
    let product_id = seed_product(&client, &server.base_url, 4).await;

    // Requesting more than is available fails, stock untouched.
    let res = client
        .post(format!("{}/requests", server.base_url))
        .json(&json!({ "user_id": user_id, "product_id": product_id, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(product_quantity(&client, &server.base_url, &product_id).await, 4);

    // Unknown product / unknown user.
    let res = client
        .post(format!("{}/requests", server.base_url))
        .json(&json!({ "user_id": user_id, "product_id": Uuid::now_v7().to_string(), "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("product_not_found"));

    let res = client
        .post(format!("{}/requests", server.base_url))
        .json(&json!({ "user_id": Uuid::now_v7().to_string(), "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("user_not_found"));

    // Non-positive quantity and malformed ids are validation errors.
    let res = client
        .post(format!("{}/requests", server.base_url))
        .json(&json!({ "user_id": user_id, "product_id": product_id, "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/requests/not-a-uuid", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
