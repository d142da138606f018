use thiserror::Error;

/// Library-wide error taxonomy.
///
/// Internal layers (ledger, SQL generator, signing) fail loudly with one of
/// these variants; the `NestPay` facade catches them at the logging boundary
/// and returns `None`/`false` sentinels, so integrating applications never
/// have to match on this type.
#[derive(Error, Debug)]
pub enum NestPayError {
    /// Required setting missing (merchant id, store key, API credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Callback authenticity/identity mismatch, order amount mismatch on
    /// re-creation, invalid recurring-payment parameters. Never partially
    /// applied.
    #[error("validation error: {0}")]
    Validation(String),

    /// Order or successful transaction missing when capture/void expected it.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure calling the gateway's synchronous API.
    #[error("transport error: {0}")]
    Transport(String),

    /// Programmer error in a table definition or field map: value variant
    /// contradicting the declared column type, or an UPDATE against a table
    /// without a primary key. Expected to abort loudly during development.
    #[error("schema error: {0}")]
    Schema(String),

    /// Raw statement execution or row decoding failed.
    #[error("database error: {0}")]
    Database(String),

    /// Storage-level uniqueness constraint rejected an insert. The ledger
    /// treats this on the transactions table as "callback already processed".
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),
}

impl From<sqlx::Error> for NestPayError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                return NestPayError::UniqueViolation(db.to_string());
            }
        }
        NestPayError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NestPayError>;
