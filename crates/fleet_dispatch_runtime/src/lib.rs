pub mod adapters;
pub mod convert;
pub mod dispatch;
pub mod handlers;
