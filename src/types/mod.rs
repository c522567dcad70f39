//! Core domain types shared by the book, the engine and the lifecycle service.

mod fixed_point;
mod order;
mod side;
mod trade;

pub use fixed_point::{Price, Quantity, SCALE};
pub use order::{Order, OrderId, OrderKind, OrderStatus, TimeInForce};
pub use side::Side;
pub use trade::{Trade, TradeId};
