pub mod ledger;
pub mod snapshot;
pub mod transfers;

pub use ledger::{AccountInfo, LedgerStore, SummaryPatch, SummaryView};
pub use snapshot::{AccountSnapshot, Snapshot, SnapshotError, SummarySnapshot};
pub use transfers::{is_transfer_category, match_transfers, MatchedTransfer, TRANSFER_CATEGORIES};
