//! Domain layer: checkout, catalog and cart types, the watch state machine,
//! and the ports the application layer talks through.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod ports;
pub mod watch;
