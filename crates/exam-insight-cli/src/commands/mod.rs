pub mod analyze;
pub mod history;
pub mod init;
pub mod validate;
