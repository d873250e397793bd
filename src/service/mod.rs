pub mod attendance;
pub mod engine;
pub mod payroll;
pub mod policy_resolver;
pub mod session;
pub mod shift_window;
