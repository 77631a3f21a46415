pub mod correlation;
pub mod dispatch;
pub mod tasks;
pub mod transport;
