pub mod init;
pub mod order;
pub mod predict;
pub mod sensor;
pub mod serve;
