//! Domain model: entities, value objects, state machines and the ports the
//! application layer depends on.

pub mod actor;
pub mod gateway;
pub mod invoice;
pub mod money;
pub mod payment;
pub mod ports;
pub mod reference;
pub mod refund;
pub mod settlement;
pub mod transaction;
pub mod wallet;
