pub mod measurement;
pub mod payment;
