pub mod health;
pub mod master;
pub mod orders;
pub mod predict;
pub mod progress;
pub mod quality;
pub mod results;
pub mod sensor;
