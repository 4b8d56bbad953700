//! Domain model: deposits, points, the refund policy table and the ports
//! the application layer depends on.

pub mod deposit;
pub mod money;
pub mod payment;
pub mod points;
pub mod policy;
pub mod ports;
