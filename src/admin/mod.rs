//! Back office: staff sessions, balance adjustments with audit records,
//! cashier teams and the user directory.

pub mod ledger;
pub mod query;
pub mod seed;
pub mod users;

pub use ledger::{AdminLedger, AdminStats, TransactionRecord, TransactionType};
pub use query::{Page, TransactionQuery, UserQuery, UserSort};
pub use users::{Role, SystemUser, UserUpdate};
