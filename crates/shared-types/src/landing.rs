//! Post-login destinations. A fixed table: these are the app router's own
//! paths, so they are not configurable.

use crate::Role;

pub const LOGIN: &str = "/login";
pub const EMPLOYEE: &str = "/employee";
pub const ASSESSOR: &str = "/assessor";
pub const HR: &str = "/hr";

/// Landing page for a role.
pub fn for_role(role: Role) -> &'static str {
    match role {
        Role::Employee => EMPLOYEE,
        Role::Assessor => ASSESSOR,
        Role::Hr => HR,
    }
}
