pub mod config;
pub mod db;
pub mod error;
pub mod master;
pub mod predict;
pub mod progress;
pub mod quality;
pub mod sensor;
pub mod time;
pub mod types;
pub mod work_order;
pub mod work_result;

pub use error::{MesError, Result};
