pub mod gate;
pub mod queue;
pub mod worker;
