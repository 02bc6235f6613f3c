pub mod attendance;
pub mod backup;
pub mod core;
pub mod stats;
pub mod subjects;
