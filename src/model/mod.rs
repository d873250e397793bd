pub mod attendance;
pub mod payroll;
pub mod policy;
pub mod punch;
pub mod shift;
