//! Role-scoped views.
//!
//! Admins see every record; agents see only what is assigned to them; with
//! nobody logged in nothing is visible. This is a display filter, not an
//! authorization boundary.

use nexa_store::{Assigned, User};

pub fn can_see<T: Assigned>(viewer: &User, record: &T) -> bool {
    viewer.is_admin() || record.assigned_to() == &viewer.id
}

/// The subset of `all` that `viewer` may see, in collection order.
pub fn scoped<T: Assigned + Clone>(viewer: Option<&User>, all: &[T]) -> Vec<T> {
    match viewer {
        None => Vec::new(),
        Some(viewer) => all.iter().filter(|r| can_see(viewer, *r)).cloned().collect(),
    }
}
