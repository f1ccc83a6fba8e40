pub mod booking;
pub mod event;
pub mod job;
pub mod pass;
