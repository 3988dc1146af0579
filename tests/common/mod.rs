#![allow(dead_code)]

use async_trait::async_trait;
use payment_settlement::application::ledger::{LedgerSettings, PaymentLedger};
use payment_settlement::application::notifier::SettlementDispatcher;
use payment_settlement::application::orchestrator::SettlementOrchestrator;
use payment_settlement::domain::actor::{Actor, Role};
use payment_settlement::domain::gateway::{
    Authorization, GatewayProvider, InitializeRequest, Verification,
};
use payment_settlement::domain::money::Amount;
use payment_settlement::domain::ports::{OrderNotifier, PaymentGateway, Stores};
use payment_settlement::domain::settlement::SettlementNotice;
use payment_settlement::error::{PaymentError, Result};
use payment_settlement::infrastructure::gateways::GatewayRegistry;
use payment_settlement::infrastructure::in_memory;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the scripted gateway answers to `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyScript {
    Success,
    Declined,
    Unavailable,
    Malformed,
}

/// In-process gateway with canned answers and call counters.
pub struct ScriptedGateway {
    pub provider: GatewayProvider,
    pub fail_initialize: bool,
    pub verify: Mutex<VerifyScript>,
    /// Delay before answering verify, to widen race windows.
    pub verify_delay: Duration,
    /// Delay before answering refund.
    pub refund_delay: Duration,
    pub fail_refund: Mutex<bool>,
    pub initialize_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub refunds: Mutex<Vec<(String, Option<Amount>)>>,
    pub last_initialize: Mutex<Option<InitializeRequest>>,
}

impl ScriptedGateway {
    pub fn new(provider: GatewayProvider) -> Self {
        Self {
            provider,
            fail_initialize: false,
            verify: Mutex::new(VerifyScript::Success),
            verify_delay: Duration::ZERO,
            refund_delay: Duration::ZERO,
            fail_refund: Mutex::new(false),
            initialize_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            refunds: Mutex::new(Vec::new()),
            last_initialize: Mutex::new(None),
        }
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    pub fn with_refund_delay(mut self, delay: Duration) -> Self {
        self.refund_delay = delay;
        self
    }

    pub fn script_refund_failure(&self, fail: bool) {
        *self.fail_refund.lock().unwrap() = fail;
    }

    pub fn script_verify(&self, script: VerifyScript) {
        *self.verify.lock().unwrap() = script;
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn provider(&self) -> GatewayProvider {
        self.provider
    }

    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_initialize.lock().unwrap() = Some(request.clone());
        if self.fail_initialize {
            return Err(PaymentError::GatewayUnavailable("connection reset".to_string()));
        }
        Ok(Authorization {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            access_code: format!("AC_{}", request.reference),
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if !self.verify_delay.is_zero() {
            tokio::time::sleep(self.verify_delay).await;
        }
        let script = *self.verify.lock().unwrap();
        match script {
            VerifyScript::Success => Ok(Verification {
                succeeded: true,
                gateway_transaction_id: Some("4099260516".to_string()),
                raw_response: json!({"status": true, "data": {"status": "success", "reference": reference}}),
            }),
            VerifyScript::Declined => Ok(Verification {
                succeeded: false,
                gateway_transaction_id: None,
                raw_response: json!({"status": true, "data": {"status": "failed"}}),
            }),
            VerifyScript::Unavailable => Err(PaymentError::GatewayUnavailable("timed out".to_string())),
            VerifyScript::Malformed => Err(PaymentError::GatewayRejected("paystack: error decoding response body".to_string())),
        }
    }

    async fn refund(&self, gateway_transaction_id: &str, amount: Option<Amount>) -> Result<Value> {
        if !self.refund_delay.is_zero() {
            tokio::time::sleep(self.refund_delay).await;
        }
        if *self.fail_refund.lock().unwrap() {
            return Err(PaymentError::GatewayUnavailable("timed out".to_string()));
        }
        self.refunds
            .lock()
            .unwrap()
            .push((gateway_transaction_id.to_string(), amount));
        Ok(json!({"status": true, "data": {"id": 3018284, "status": "pending"}}))
    }
}

/// Forwards every notice to a channel the test can await.
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<SettlementNotice>,
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn on_payment_settled(&self, notice: &SettlementNotice) -> Result<()> {
        let _ = self.sender.send(notice.clone());
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: SettlementOrchestrator,
    pub gateway: Arc<ScriptedGateway>,
    pub notices: mpsc::UnboundedReceiver<SettlementNotice>,
    pub stores: Stores,
}

impl Harness {
    pub fn new(gateway: ScriptedGateway) -> Self {
        let gateway = Arc::new(gateway);
        let stores = in_memory::stores();
        let (sender, notices) = mpsc::unbounded_channel();
        let (dispatcher, _worker) = SettlementDispatcher::spawn(Arc::new(RecordingNotifier { sender }));
        let orchestrator = SettlementOrchestrator::new(
            PaymentLedger::new(stores.clone(), LedgerSettings::default()),
            GatewayRegistry::new().with(gateway.clone()),
            dispatcher,
            "executetechacademy.com",
        );
        Self {
            orchestrator,
            gateway,
            notices,
            stores,
        }
    }

    pub fn paystack() -> Self {
        Self::new(ScriptedGateway::new(GatewayProvider::Paystack))
    }

    /// Waits briefly for the next notice, `None` if nothing arrives.
    pub async fn next_notice(&mut self) -> Option<SettlementNotice> {
        tokio::time::timeout(Duration::from_millis(200), self.notices.recv())
            .await
            .ok()
            .flatten()
    }
}

pub fn student(id: u64) -> Actor {
    Actor {
        user_id: id,
        role: Role::Student,
        email: Some(format!("student{id}@example.com")),
    }
}

pub fn admin() -> Actor {
    Actor::new(1, Role::Admin)
}
