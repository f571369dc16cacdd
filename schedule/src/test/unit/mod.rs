pub mod dce;
pub mod scheduler;
