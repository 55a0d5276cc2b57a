pub mod collective;
pub mod comm;
pub mod config;
pub mod device;
pub mod transport;
pub mod utils;
