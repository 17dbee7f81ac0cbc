//! Risk policy: the permission table and the safety gate built on it.

pub mod gate;
pub mod permissions;

pub use gate::SafetyGate;
pub use permissions::{Permission, PermissionTable};
