//! Application layer: the payment ledger, the settlement orchestrator that
//! drives payments through the gateways, and the background dispatcher that
//! reports settlements to the order service.

pub mod ledger;
pub mod notifier;
pub mod orchestrator;
