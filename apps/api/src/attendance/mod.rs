// Time clock: check-in/out, breaks, derived status and hours.
// Pure arithmetic lives in time_calc; store holds the SQL.

pub mod handlers;
pub mod store;
pub mod summary;
pub mod time_calc;
