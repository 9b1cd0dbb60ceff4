use chrono::{Duration as ChronoDuration, Utc};
use ledgerdesk_auth::{JwtClaims, PrincipalId, Role};
use ledgerdesk_core::TenantId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let app = ledgerdesk_api::app::build_app(jwt_secret.to_string());
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

const SECRET: &str = "test-secret";

fn mint_jwt(jwt_secret: &str, tenant_id: TenantId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        tenant_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token(tenant_id: TenantId) -> String {
    mint_jwt(SECRET, tenant_id, vec![Role::new(Role::ADMIN)])
}

async fn send_json(req: reqwest::RequestBuilder, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = req.bearer_auth(token);
    let req = match body {
        Some(b) => req.json(&b),
        None => req,
    };
    let res = req.send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn create_ledger(client: &reqwest::Client, srv: &TestServer, token: &str, name: &str, subtype: &str, opening: &str) -> Value {
    let (status, body) = send_json(
        client.post(srv.url("/ledgers")),
        token,
        Some(json!({ "name": name, "subtype": subtype, "opening_balance": opening })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn ledger_balance(client: &reqwest::Client, srv: &TestServer, token: &str, id: &str) -> String {
    let (status, body) = send_json(client.get(srv.url(&format!("/ledgers/{id}"))), token, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["current_balance"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(SECRET).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let forged = mint_jwt("other-secret", TenantId::new(), vec![Role::new(Role::ADMIN)]);
    let res = client.get(srv.url("/whoami")).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();

    let (status, body) = send_json(client.get(srv.url("/whoami")), &admin_token(tenant_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert!(body["data"]["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn voucher_post_and_reverse_moves_cash_balance() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let cash = create_ledger(&client, &srv, &token, "Cash", "CASH", "1000").await;
    create_ledger(&client, &srv, &token, "Sales", "INCOME", "0").await;
    let cash_id = cash["id"].as_str().unwrap();

    let (status, body) = send_json(
        client.post(srv.url("/vouchers")),
        &token,
        Some(json!({
            "voucher_type_id": "SALES",
            "date": "2026-04-01",
            "entries": [
                { "ledger_name": "Cash", "entry_type": "DEBIT", "amount": "500" },
                { "ledger_name": "Sales", "entry_type": "CREDIT", "amount": "500" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "POSTED");
    assert_eq!(body["data"]["voucher_number"], "SAL-1");
    let voucher_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ledger_balance(&client, &srv, &token, cash_id).await, "1500");

    let (status, body) = send_json(
        client.delete(srv.url(&format!("/vouchers/{voucher_id}"))),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["action"], "reversed");
    assert_eq!(ledger_balance(&client, &srv, &token, cash_id).await, "1000");

    let (status, _) = send_json(
        client.delete(srv.url(&format!("/vouchers/{voucher_id}"))),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(ledger_balance(&client, &srv, &token, cash_id).await, "1000");

    let (status, body) = send_json(
        client.get(srv.url(&format!("/ledgers/{cash_id}/reconcile"))),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balanced"], true);
}

#[tokio::test]
async fn unbalanced_voucher_is_a_bad_request() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, body) = send_json(
        client.post(srv.url("/vouchers")),
        &token,
        Some(json!({
            "voucher_type_id": "JOURNAL",
            "date": "2026-04-01",
            "entries": [
                { "ledger_name": "A", "entry_type": "DEBIT", "amount": 100 },
                { "ledger_name": "B", "entry_type": "CREDIT", "amount": 90 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn non_positive_amount_gets_the_error_envelope() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    for amount in ["0", "-5"] {
        let (status, body) = send_json(
            client.post(srv.url("/vouchers")),
            &token,
            Some(json!({
                "voucher_type_id": "JOURNAL",
                "date": "2026-04-01",
                "entries": [
                    { "ledger_name": "A", "entry_type": "DEBIT", "amount": amount },
                    { "ledger_name": "B", "entry_type": "CREDIT", "amount": amount }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}: {body}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let (status, body) = send_json(
        client.post(srv.url("/accounts")),
        &token,
        Some(json!({ "name": "Current", "balance": "1000" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let account_id = body["data"]["id"].as_str().unwrap().to_string();

    for amount in ["0", "-5"] {
        let (status, body) = send_json(
            client.post(srv.url("/transactions")),
            &token,
            Some(json!({ "accountId": account_id, "amount": amount, "type": "DEBIT" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}: {body}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn malformed_json_gets_the_error_envelope() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let res = client
        .post(srv.url("/ledgers"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{\"name\": \"Cash\",")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn out_of_range_amounts_are_rejected_without_side_effects() {
    const MAX: &str = "79228162514264337593543950335";
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, body) = send_json(
        client.post(srv.url("/vouchers")),
        &token,
        Some(json!({
            "voucher_type_id": "JOURNAL",
            "date": "2026-04-01",
            "entries": [
                { "ledger_name": "A", "entry_type": "DEBIT", "amount": MAX },
                { "ledger_name": "A2", "entry_type": "DEBIT", "amount": MAX },
                { "ledger_name": "B", "entry_type": "CREDIT", "amount": "1" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "validation_error");

    let cash = create_ledger(&client, &srv, &token, "Cash", "CASH", MAX).await;
    create_ledger(&client, &srv, &token, "Capital", "CAPITAL", "0").await;
    let (status, body) = send_json(
        client.post(srv.url("/vouchers")),
        &token,
        Some(json!({
            "voucher_type_id": "RECEIPT",
            "date": "2026-04-01",
            "entries": [
                { "ledger_name": "Cash", "entry_type": "DEBIT", "amount": "1" },
                { "ledger_name": "Capital", "entry_type": "CREDIT", "amount": "1" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "amount out of range");
    assert_eq!(ledger_balance(&client, &srv, &token, cash["id"].as_str().unwrap()).await, MAX);
}

#[tokio::test]
async fn draft_can_be_posted_later() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let cash = create_ledger(&client, &srv, &token, "Cash", "CASH", "0").await;
    create_ledger(&client, &srv, &token, "Capital", "CAPITAL", "0").await;
    let cash_id = cash["id"].as_str().unwrap();

    let (status, body) = send_json(
        client.post(srv.url("/vouchers")),
        &token,
        Some(json!({
            "voucher_type_id": "RECEIPT",
            "date": "2026-04-02",
            "auto_post": false,
            "entries": [
                { "ledger_name": "Cash", "entry_type": "DEBIT", "amount": "250" },
                { "ledger_name": "Capital", "entry_type": "CREDIT", "amount": "250" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "DRAFT");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ledger_balance(&client, &srv, &token, cash_id).await, "0");

    let (status, body) = send_json(client.post(srv.url(&format!("/vouchers/{id}/post"))), &token, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "POSTED");
    assert_eq!(ledger_balance(&client, &srv, &token, cash_id).await, "250");
}

#[tokio::test]
async fn transaction_debit_then_delete_restores_balance() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, body) = send_json(
        client.post(srv.url("/accounts")),
        &token,
        Some(json!({ "name": "Current", "balance": "1000" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let account_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        client.post(srv.url("/transactions")),
        &token,
        Some(json!({ "accountId": account_id, "amount": "200", "type": "DEBIT", "description": "rent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let tx_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send_json(client.get(srv.url(&format!("/accounts/{account_id}"))), &token, None).await;
    assert_eq!(body["data"]["balance"], "800");

    let (status, _) = send_json(client.delete(srv.url(&format!("/transactions/{tx_id}"))), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(client.delete(srv.url(&format!("/transactions/{tx_id}"))), &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send_json(client.get(srv.url(&format!("/accounts/{account_id}"))), &token, None).await;
    assert_eq!(body["data"]["balance"], "1000");
}

#[tokio::test]
async fn transaction_list_is_paginated_with_total() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (_, body) = send_json(client.post(srv.url("/accounts")), &token, Some(json!({ "name": "Ops" }))).await;
    let account_id = body["data"]["id"].as_str().unwrap().to_string();

    for _ in 0..12 {
        let (status, _) = send_json(
        client.post(srv.url("/transactions")),
            &token,
            Some(json!({ "account_id": account_id, "amount": 5, "type": "CREDIT" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send_json(
        client.get(srv.url(&format!("/transactions?accountId={account_id}&limit=10&offset=0"))),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert_eq!(body["pagination"]["total"], 12);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["offset"], 0);
}

#[tokio::test]
async fn viewer_cannot_write() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(SECRET, TenantId::new(), vec![Role::new(Role::VIEWER)]);

    let (status, body) = send_json(
        client.post(srv.url("/ledgers")),
        &token,
        Some(json!({ "name": "Cash", "subtype": "CASH" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let res = client
        .get(srv.url("/tally/export/ledgers?format=csv"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().starts_with("Name,Group,Code"));
}

#[tokio::test]
async fn tenant_isolation_blocks_cross_tenant_reads() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token_a = admin_token(TenantId::new());
    let token_b = admin_token(TenantId::new());

    let cash = create_ledger(&client, &srv, &token_a, "Cash", "CASH", "10").await;
    let id = cash["id"].as_str().unwrap();

    let (status, _) = send_json(client.get(srv.url(&format!("/ledgers/{id}"))), &token_b, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send_json(client.get(srv.url("/ledgers")), &token_b, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn gst_compute_splits_intra_state_tax() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, body) = send_json(
        client.post(srv.url("/gst/compute")),
        &token,
        Some(json!({ "taxable_value": "1000", "rate": "18", "supply": "INTRA_STATE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let amount = |key: &str| body["data"][key].as_str().unwrap().parse::<Decimal>().unwrap();
    assert_eq!(amount("cgst"), Decimal::from(90));
    assert_eq!(amount("total"), Decimal::from(1180));

    let (status, _) = send_json(
        client.post(srv.url("/gst/compute")),
        &token,
        Some(json!({ "taxable_value": "1000", "rate": "7", "supply": "INTER_STATE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tally_import_reports_counts() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, body) = send_json(
        client.post(srv.url("/tally/import")),
        &token,
        Some(json!({
            "sheets": [
                { "name": "Ledger", "csv": "Name,Group,Opening Balance\nCash,Cash-in-Hand,100\nSales,Sales Accounts,0\n" },
                { "name": "Transactions", "csv": "Date,Voucher Type,Voucher No,Ledger,Debit,Credit\n2026-04-01,Sales,S1,Cash,40,\n2026-04-01,Sales,S1,Sales,,40\n" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["ledgers_created"], 2);
    assert_eq!(body["data"]["vouchers_posted"], 1);
    assert!(body["data"]["errors"].as_array().unwrap().is_empty());

    let res = client
        .get(srv.url("/tally/export/vouchers?format=csv"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let csv = res.text().await.unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("S1"));
}

#[tokio::test]
async fn xlsx_export_imports_into_another_tenant() {
    const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token_a = admin_token(TenantId::new());
    let token_b = admin_token(TenantId::new());

    create_ledger(&client, &srv, &token_a, "Cash", "CASH", "100").await;
    create_ledger(&client, &srv, &token_a, "Sales", "INCOME", "0").await;

    let res = client
        .get(srv.url("/tally/export/ledgers"))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], XLSX);
    let bytes = res.bytes().await.unwrap();
    assert!(bytes.starts_with(b"PK"));

    let res = client
        .post(srv.url("/tally/import"))
        .bearer_auth(&token_b)
        .header("content-type", XLSX)
        .body(bytes)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["ledgers_created"], 2, "{body}");

    let (status, body) = send_json(client.get(srv.url("/ledgers")), &token_b, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2), "{body}");

    let res = client
        .post(srv.url("/tally/import"))
        .bearer_auth(&token_b)
        .header("content-type", XLSX)
        .body("not a workbook")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}
