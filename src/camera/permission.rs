//! Runtime permission requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permissions a camera session may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Access to the camera.
    Camera,
    /// Access to the microphone, for audio tracks.
    Microphone,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => f.write_str("camera"),
            Permission::Microphone => f.write_str("microphone"),
        }
    }
}

/// Trait for platform permission prompts.
pub trait PermissionProvider {
    /// Requests `permission`, returning true if it is granted.
    fn request(&mut self, permission: Permission) -> bool;
}

/// Permission provider with fixed answers.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    denied: Vec<Permission>,
}

impl StaticPermissions {
    /// Grants everything.
    pub fn granted() -> Self {
        Self::default()
    }

    /// Denies everything.
    pub fn denied() -> Self {
        Self {
            denied: vec![Permission::Camera, Permission::Microphone],
        }
    }

    /// Denies only `permission`.
    pub fn denying(permission: Permission) -> Self {
        Self {
            denied: vec![permission],
        }
    }
}

impl PermissionProvider for StaticPermissions {
    fn request(&mut self, permission: Permission) -> bool {
        let granted = !self.denied.contains(&permission);
        tracing::debug!(%permission, granted, "Permission requested");
        granted
    }
}
