use payment_settlement::domain::gateway::InitializeRequest;
use payment_settlement::domain::money::{Amount, Currency};
use payment_settlement::domain::ports::{OrderNotifier, PaymentGateway};
use payment_settlement::domain::settlement::{SettlementNotice, SettlementOutcome};
use payment_settlement::error::PaymentError;
use payment_settlement::infrastructure::gateways::{FlutterwaveGateway, PaystackGateway, StripeGateway};
use payment_settlement::infrastructure::order_client::HttpOrderNotifier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_request(amount: Decimal) -> InitializeRequest {
    InitializeRequest {
        payer_email: "student9@example.com".to_string(),
        amount: Amount::new(amount).unwrap(),
        currency: Currency::default(),
        reference: "PAY-0123456789AB".to_string(),
        callback_url: "https://x/cb".to_string(),
        metadata: Some(json!({"order_id": 12})),
    }
}

#[tokio::test]
async fn test_paystack_initialize_sends_kobo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_json(json!({
            "email": "student9@example.com",
            "amount": 500000,
            "currency": "NGN",
            "reference": "PAY-0123456789AB",
            "callback_url": "https://x/cb",
            "metadata": {"order_id": 12}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "PAY-0123456789AB"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "sk_test_123", Duration::from_secs(5)).unwrap();
    let auth = gateway.initialize(&init_request(dec!(5000.00))).await.unwrap();

    assert_eq!(auth.authorization_url, "https://checkout.paystack.com/abc123");
    assert_eq!(auth.access_code, "abc123");
}

#[tokio::test]
async fn test_paystack_decline_is_initiation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": false,
            "message": "Invalid key"
        })))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "bad", Duration::from_secs(5)).unwrap();
    let result = gateway.initialize(&init_request(dec!(10))).await;

    assert!(matches!(result, Err(PaymentError::PaymentInitiationFailed(m)) if m == "Invalid key"));
}

#[tokio::test]
async fn test_paystack_verify_reports_success_and_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/PAY-0123456789AB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Verification successful",
            "data": {"id": 4099260516_u64, "status": "success", "amount": 500000}
        })))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "sk", Duration::from_secs(5)).unwrap();
    let verification = gateway.verify("PAY-0123456789AB").await.unwrap();

    assert!(verification.succeeded);
    assert_eq!(verification.gateway_transaction_id.as_deref(), Some("4099260516"));
    assert_eq!(verification.raw_response["data"]["amount"], 500000);
}

#[tokio::test]
async fn test_paystack_abandoned_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/PAY-0123456789AB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {"id": 1, "status": "abandoned"}
        })))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "sk", Duration::from_secs(5)).unwrap();
    assert!(!gateway.verify("PAY-0123456789AB").await.unwrap().succeeded);
}

#[tokio::test]
async fn test_timeout_and_server_error_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/SLOW"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/BROKEN"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "sk", Duration::from_millis(100)).unwrap();

    let slow = gateway.verify("SLOW").await;
    assert!(matches!(slow, Err(PaymentError::GatewayUnavailable(_))));
    let broken = gateway.verify("BROKEN").await;
    assert!(matches!(broken, Err(PaymentError::GatewayUnavailable(_))));
}

#[tokio::test]
async fn test_unreachable_gateway_is_unavailable() {
    // Nothing listens on port 9 of localhost in the test environment.
    let gateway = PaystackGateway::new("http://127.0.0.1:9", "sk", Duration::from_secs(1)).unwrap();
    let result = gateway.verify("PAY-0123456789AB").await;
    assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));
}

#[tokio::test]
async fn test_paystack_partial_refund_amount_in_kobo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refund"))
        .and(body_json(json!({"transaction": "4099260516", "amount": 3050})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {"id": 3018284}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = PaystackGateway::new(server.uri(), "sk", Duration::from_secs(5)).unwrap();
    let response = gateway
        .refund("4099260516", Some(Amount::new(dec!(30.50)).unwrap()))
        .await
        .unwrap();
    assert_eq!(response["data"]["id"], 3018284);
}

#[tokio::test]
async fn test_flutterwave_sends_major_units() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(body_json(json!({
            "tx_ref": "PAY-0123456789AB",
            "amount": 5000.5,
            "currency": "NGN",
            "redirect_url": "https://x/cb",
            "customer": {"email": "student9@example.com"},
            "meta": {"order_id": 12}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Hosted Link",
            "data": {"link": "https://checkout.flutterwave.com/v3/hosted/pay/xyz"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = FlutterwaveGateway::new(server.uri(), "FLWSECK_TEST", Duration::from_secs(5)).unwrap();
    let auth = gateway.initialize(&init_request(dec!(5000.50))).await.unwrap();

    assert_eq!(auth.authorization_url, "https://checkout.flutterwave.com/v3/hosted/pay/xyz");
    assert_eq!(auth.access_code, "");
}

#[tokio::test]
async fn test_flutterwave_verify_by_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/verify_by_reference"))
        .and(query_param("tx_ref", "PAY-0123456789AB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"id": 288192, "status": "successful"}
        })))
        .mount(&server)
        .await;

    let gateway = FlutterwaveGateway::new(server.uri(), "sk", Duration::from_secs(5)).unwrap();
    let verification = gateway.verify("PAY-0123456789AB").await.unwrap();
    assert!(verification.succeeded);
    assert_eq!(verification.gateway_transaction_id.as_deref(), Some("288192"));
}

#[tokio::test]
async fn test_stripe_checkout_session_uses_cents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("unit_amount%5D=500000"))
        .and(body_string_contains("client_reference_id=PAY-0123456789AB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_a1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_a1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test", Duration::from_secs(5)).unwrap();
    let auth = gateway.initialize(&init_request(dec!(5000.00))).await.unwrap();
    assert_eq!(auth.access_code, "cs_test_a1");
    assert_eq!(auth.authorization_url, "https://checkout.stripe.com/c/pay/cs_test_a1");
}

#[tokio::test]
async fn test_stripe_refund_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/refunds"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Charge has already been refunded."}
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test", Duration::from_secs(5)).unwrap();
    let result = gateway.refund("pi_1", None).await;
    assert!(matches!(result, Err(PaymentError::GatewayRejected(m)) if m == "Charge has already been refunded."));
}

#[tokio::test]
async fn test_order_notifier_puts_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/301"))
        .and(body_json(json!({"status": "confirmed"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orders/302"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let notifier = HttpOrderNotifier::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    notifier
        .on_payment_settled(&SettlementNotice {
            order_id: 301,
            payment_reference: "PAY-0123456789AB".to_string(),
            outcome: SettlementOutcome::Confirmed,
        })
        .await
        .unwrap();

    let missing = notifier
        .on_payment_settled(&SettlementNotice {
            order_id: 302,
            payment_reference: "PAY-0123456789AC".to_string(),
            outcome: SettlementOutcome::Failed,
        })
        .await;
    assert!(matches!(missing, Err(PaymentError::GatewayRejected(_))));
}
