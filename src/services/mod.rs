pub mod ledger;
pub mod orders;
pub mod payments;

pub use ledger::TransactionLedger;
pub use orders::OrderStore;
pub use payments::NestPay;
