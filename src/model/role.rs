use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Instructor = 2,
    Student = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Instructor),
            3 => Some(Role::Student),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Account table holding users of this role.
    pub fn table(self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Instructor => "instructors",
            Role::Student => "students",
        }
    }

    /// Landing page a client should open after login.
    pub fn home(self) -> &'static str {
        match self {
            Role::Admin => "/admin_dashboard",
            Role::Instructor => "/instructor_dashboard",
            Role::Student => "/student_dashboard",
        }
    }
}
