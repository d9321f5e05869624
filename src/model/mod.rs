pub mod admin;
pub mod attendance;
pub mod instructor;
pub mod module;
pub mod role;
pub mod student;
