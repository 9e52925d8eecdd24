//! Connectivity state carried by transition events

use serde::{Deserialize, Serialize};

/// Reachability of the remote system of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

crate::impl_domain_status_conversions!(Connectivity {
    Online => "online",
    Offline => "offline",
});

impl Connectivity {
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}
