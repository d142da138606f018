//! Typed entities for orders, addresses, line items and transactions.
//! Each entity owns its hosted-page parameter assembly and its field-map
//! (de)serialization edge; persistence itself lives in the services layer.

pub mod address;
pub mod item;
pub mod order;
pub mod transaction;

pub use address::OrderAddress;
pub use item::OrderItem;
pub use order::{FrequencyUnit, Order, RecurringPayment};
pub use transaction::{Transaction, TransactionStatus};
