// ==========================================
// College ERP - Action log repository
// ==========================================
// Every write operation records one row.
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
pub(crate) use core::insert_on;
