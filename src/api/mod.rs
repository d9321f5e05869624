pub mod attendance;
pub mod dashboard;
pub mod instructors;
pub mod modules;
pub mod profile;
pub mod students;
