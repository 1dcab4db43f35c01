// Models module - Database entity representations

pub mod card;
pub mod entry_log;
pub mod lost_scan;

pub use card::{CardRecord, CardStatus};
pub use entry_log::EntryLog;
pub use lost_scan::LostCardScan;
