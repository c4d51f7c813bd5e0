pub mod category;
pub mod date;
pub mod money;
pub mod record;
pub mod text;

pub use category::{resolve_category, CategoryOverride, OverrideKey, RuleSet};
pub use date::DateFormat;
pub use money::Money;
pub use record::{AccountKind, RawRecord, Transaction, UploadBatch};
pub use text::collapse_whitespace;
