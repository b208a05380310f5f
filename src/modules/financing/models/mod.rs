pub mod allocation_intent;
pub mod financing;
pub mod installment;
pub mod payment;

pub use allocation_intent::{AllocationIntent, IntentLine, AFFECTED_CUOTAS_KEY};
pub use financing::Financing;
pub use installment::{derive_status, Installment, InstallmentStatus};
pub use payment::{Payment, PaymentStatus, FINANCING_INSTALLMENTS_ENTITY};
