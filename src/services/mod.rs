//! Services module for business logic

pub mod dropoff_lifecycle;
pub mod notification;
pub mod payment_reconciler;
pub mod transaction_manager;
pub mod waste_item_ledger;

pub use dropoff_lifecycle::{DropoffLifecycle, DropoffStatus, PickupMethod};
pub use notification::NotificationService;
pub use payment_reconciler::PaymentReconciler;
pub use transaction_manager::{TransactionManager, TransactionStatus, TransactionType};
pub use waste_item_ledger::WasteItemLedger;
