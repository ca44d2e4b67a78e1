use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::{http::StatusCode, test, App};
use async_trait::async_trait;
use billcore::config::BillingConfig;
use billcore::core::{AppError, Result};
use billcore::middleware::RequestId;
use billcore::sequences::{CounterStore, InMemoryCounterStore, SequenceKey};
use billcore::startup::Stores;
use billcore::AppState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// HTTP surface on in-memory stores

#[cfg(test)]
mod billing_api_tests {
    use super::*;

    fn amount(value: &Value) -> Decimal {
        match value.as_str() {
            Some(s) => s.parse().unwrap(),
            None => value.to_string().parse().unwrap(),
        }
    }

    fn invoice_body(rate: &str) -> Value {
        json!({
            "document_type": "credit_bill",
            "company": { "name": "WYENFOS", "state_code": "32" },
            "customer": {
                "id": "cust-1",
                "name": "Anu Traders",
                "contact": "9847000000",
                "state_code": "32"
            },
            "apply_round_off": false,
            "invoice_date": "2025-05-01",
            "items": [
                { "description": "Service", "quantity": "1", "rate": rate, "gst_rate": "0" }
            ]
        })
    }

    #[derive(Default)]
    struct SwitchableStore {
        inner: InMemoryCounterStore,
        offline: AtomicBool,
    }

    #[async_trait]
    impl CounterStore for SwitchableStore {
        async fn increment(&self, key: &SequenceKey) -> Result<u64> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(AppError::allocation_failure("connection refused"));
            }
            self.inner.increment(key).await
        }

        async fn seed(&self, key: &SequenceKey, last_issued: u64) -> Result<u64> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(AppError::allocation_failure("connection refused"));
            }
            self.inner.seed(key, last_issued).await
        }

        async fn current(&self, key: &SequenceKey) -> Result<Option<u64>> {
            self.inner.current(key).await
        }
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .wrap(RequestId)
                    .configure(|cfg| AppState::in_memory(BillingConfig::default()).configure(cfg)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_reports_memory_backend() {
        let app = app!();

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["storage"], "memory");
        assert_eq!(body["checks"]["database"], "not_configured");
    }

    #[actix_web::test]
    async fn test_settlement_flow_over_http() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/invoices")
            .set_json(invoice_body("1000"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let invoice: Value = test::read_body_json(resp).await;
        let invoice_id = invoice["id"].as_str().unwrap().to_string();
        assert_eq!(invoice["document_number"], "WNF-1");
        assert_eq!(amount(&invoice["totals"]["grand_total"]), dec!(1000));

        for (date, paid) in [("2025-05-02", "400.00"), ("2025-05-03", "600.00")] {
            let req = test::TestRequest::post()
                .uri(&format!("/invoices/{}/payment-notes", invoice_id))
                .set_json(json!({ "date": date, "amount_paid": paid }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri(&format!("/invoices/{}/ledger", invoice_id))
            .to_request();
        let ledger: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ledger["payment_status"], "Fully Paid");
        assert_eq!(ledger["is_fully_paid"], true);
        let balances: Vec<Decimal> = ledger["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| amount(&e["balance"]))
            .collect();
        assert_eq!(balances, vec![dec!(1000), dec!(600), dec!(0)]);

        let req = test::TestRequest::post()
            .uri(&format!("/invoices/{}/receipts", invoice_id))
            .set_json(json!({ "requested_amount": "1000.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let receipt: Value = test::read_body_json(resp).await;
        assert_eq!(receipt["receipt_number"], "WNF-1");
        assert_eq!(receipt["payment_status"], "Fully Paid");

        let req = test::TestRequest::get()
            .uri(&format!("/receipts/{}", receipt["id"].as_str().unwrap()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri(&format!("/invoices/{}/items", invoice_id))
            .set_json(json!({ "items": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], "CONFLICT");
    }

    #[actix_web::test]
    async fn test_partial_receipt_is_unprocessable() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/invoices")
            .set_json(invoice_body("1000"))
            .to_request();
        let invoice: Value = test::call_and_read_body_json(&app, req).await;
        let invoice_id = invoice["id"].as_str().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/invoices/{}/payment-notes", invoice_id))
            .set_json(json!({ "date": "2025-05-02", "amount_paid": "400.00" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/invoices/{}/receipts", invoice_id))
            .set_json(json!({ "requested_amount": "400.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], "AMOUNT_MISMATCH");
        assert_eq!(body["error"]["expected"], "1000.00");
        assert_eq!(body["error"]["actual"], "400.00");
    }

    #[actix_web::test]
    async fn test_invalid_line_item_is_bad_request() {
        let app = app!();
        let mut body = invoice_body("1000");
        body["items"][0]["quantity"] = json!("-2");

        let req = test::TestRequest::post().uri("/invoices").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], "INVALID_LINE_ITEM");
    }

    #[actix_web::test]
    async fn test_unknown_request_field_rejected() {
        let app = app!();
        let mut body = invoice_body("1000");
        body["discount"] = json!("10");

        let req = test::TestRequest::post().uri("/invoices").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn test_missing_invoice_is_not_found() {
        let app = app!();

        for uri in ["/invoices/missing", "/invoices/missing/ledger"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn test_confirm_numbers_with_nothing_pending() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/invoices/confirm-numbers")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["confirmed"], json!([]));
    }

    #[actix_web::test]
    async fn test_confirm_numbers_after_outage() {
        let store = Arc::new(SwitchableStore::default());
        let state = AppState::from_stores(
            Stores {
                counters: store.clone(),
                ..Stores::in_memory()
            },
            BillingConfig::default(),
            None,
        );
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let mut numbers = Vec::new();
        for offline in [false, true, false] {
            store.offline.store(offline, Ordering::SeqCst);
            let req = test::TestRequest::post()
                .uri("/invoices")
                .set_json(invoice_body("100"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let invoice: Value = test::read_body_json(resp).await;
            numbers.push((
                invoice["document_number"].as_str().unwrap().to_string(),
                invoice["number_unconfirmed"].as_bool().unwrap(),
            ));
        }
        assert_eq!(
            numbers,
            vec![
                ("WNF-1".to_string(), false),
                ("WNF-2".to_string(), true),
                ("WNF-3".to_string(), false),
            ]
        );

        let req = test::TestRequest::get().uri("/sequences/unconfirmed").to_request();
        let pending: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/invoices/confirm-numbers")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let confirmed = body["confirmed"].as_array().unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0]["document_type"], "credit_bill");
        assert_eq!(confirmed[0]["previous_number"], "WNF-2");
        assert_eq!(confirmed[0]["document_number"], "WNF-4");

        let req = test::TestRequest::get().uri("/sequences/unconfirmed").to_request();
        let pending: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending, json!([]));
    }

    #[actix_web::test]
    async fn test_request_id_is_echoed() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header(("x-request-id", "req-42"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-42");
    }
}
