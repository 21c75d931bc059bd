pub mod enqueue;
pub mod worker;
