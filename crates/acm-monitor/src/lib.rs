pub mod notify;
pub mod policy;
pub mod reload;
pub mod scheduler;
pub mod source;

pub use notify::{Alert, LogNotifier, Notifier};
pub use policy::AlertPolicy;
pub use reload::{MarkerFileReloader, TimelineReloader};
pub use scheduler::{RefreshOutcome, RefreshScheduler};
pub use source::{BalanceSource, VaultBalanceSource};
