pub mod alert;
pub mod event;
pub mod records;
