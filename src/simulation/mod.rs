pub mod progress;
pub mod sgs;
