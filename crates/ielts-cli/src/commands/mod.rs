pub mod band;
pub mod grade;
pub mod init;
pub mod session;
pub mod validate;
