// HTTP contract tests for the loan and payment API

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::{test, web, App};
use billing_loan::modules::health::controllers::health_controller;
use billing_loan::modules::loans::controllers::loan_controller;
use billing_loan::modules::payments::controllers::payment_controller;
use helpers::*;
use serde_json::{json, Value};

macro_rules! app {
    ($harness:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($harness.loans.clone()))
                .app_data(web::Data::new($harness.payments.clone()))
                .configure(health_controller::configure)
                .service(
                    web::scope("/api/v1")
                        .configure(loan_controller::configure)
                        .configure(payment_controller::configure),
                ),
        )
        .await
    };
}

#[actix_web::test]
async fn test_create_payment_returns_201_pending() {
    let harness = Harness::with_terms(10, 1).await;
    let loan = harness.billed_loan(1_250_000).await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(pay(&loan, &loan.loan_bills[0]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Payment accepted for processing");
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["amount"], 1_375_000);
    assert_eq!(body["data"]["loan_bill_id"], loan.loan_bills[0].id);
}

#[actix_web::test]
async fn test_amount_mismatch_returns_400() {
    let harness = Harness::with_terms(10, 1).await;
    let loan = harness.billed_loan(1_250_000).await;
    let app = app!(harness);

    let mut request = pay(&loan, &loan.loan_bills[0]);
    request.amount = 1_000_000;
    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(request)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 400);
    assert_eq!(body["error"]["kind"], "payment_amount_mismatch");
    assert!(harness.store.payments().await.is_empty());
}

#[actix_web::test]
async fn test_unbilled_bill_returns_409() {
    let harness = Harness::new().await;
    let loan = harness.loan(10000).await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(pay(&loan, &loan.loan_bills[0]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["kind"], "loan_bill_not_billed");
}

#[actix_web::test]
async fn test_missing_identifier_returns_400() {
    let harness = Harness::new().await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(json!({ "user_id": 1, "loan_id": 0, "loan_bill_id": 1, "amount": 2200 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["kind"], "validation");
}

#[actix_web::test]
async fn test_get_payment() {
    let harness = Harness::new().await;
    let loan = harness.billed_loan(10000).await;
    let payment = harness
        .payments
        .initiate(&pay(&loan, &loan.loan_bills[0]))
        .await
        .unwrap();
    let app = app!(harness);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payments/{}", payment.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["id"], payment.id);

    let req = test::TestRequest::get().uri("/api/v1/payments/999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_create_loan_returns_schedule() {
    let harness = Harness::new().await;
    let user = harness.user("Sari").await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/loans")
        .set_json(json!({ "user_id": user.id, "name": "Kiosk", "loan_amount": 10000 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Loan created");
    assert_eq!(body["data"]["status"], "ACTIVE");
    assert_eq!(body["data"]["loan_total_amount"], 11000);
    assert_eq!(body["data"]["outstanding_amount"], 11000);

    let bills = body["data"]["loan_bills"].as_array().unwrap();
    assert_eq!(bills.len(), 5);
    assert!(bills.iter().all(|bill| bill["billing_total_amount"] == 2200));
    assert!(bills.iter().all(|bill| bill["status"] == "PENDING"));
}

#[actix_web::test]
async fn test_create_loan_for_unknown_user_returns_404() {
    let harness = Harness::new().await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/loans")
        .set_json(json!({ "user_id": 404, "name": "Kiosk", "loan_amount": 10000 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_list_user_loans() {
    let harness = Harness::new().await;
    let user = harness.user("Dewi").await;
    harness.loan_for(user.id, 10000).await;
    harness.loan_for(user.id, 20000).await;
    let app = app!(harness);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{}/loans", user.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    let loans = body["data"].as_array().unwrap();
    assert_eq!(loans.len(), 2);
    assert_eq!(loans[1]["loan_amount"], 20000);
    assert_eq!(loans[1]["loan_bills"].as_array().unwrap().len(), 5);
}

#[actix_web::test]
async fn test_health_endpoint() {
    let harness = Harness::new().await;
    let app = app!(harness);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
}
