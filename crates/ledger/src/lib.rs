pub mod backfill;
pub mod record;
mod schema;
pub mod store;

pub use backfill::backfill_forward_fields;
pub use record::{LedgerRecord, LEDGER_COLUMNS};
pub use store::{LedgerError, RecordLedger, SortOrder};
