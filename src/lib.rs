pub mod config;
pub mod io;
pub mod system;
pub mod tracking;
pub mod vision;
pub mod viz;
