pub mod attendance;
pub mod company;
pub mod employee;
pub mod interview;
pub mod job;
pub mod manual;
pub mod payroll;
pub mod user;
