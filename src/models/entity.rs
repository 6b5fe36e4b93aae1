//! Entity type tags
//!
//! Every persisted record belongs to exactly one entity type. The tag selects
//! the record's redaction denylist, natural key and conflict policy in the
//! entity registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The entity types persisted by the CRM backend
///
/// Variant order is registry order; maps keyed by `EntityType` iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    /// Back-office users (agents, administrators)
    Users,
    /// Property listings
    Properties,
    /// Customers known to the agency
    Customers,
    /// Sales leads linking customers to properties
    Leads,
    /// Viewings and meetings
    Appointments,
    /// Newsletter mailing list
    NewsletterSubscribers,
    /// Append-only activity log
    ActivityLog,
    /// Named site configuration values
    SiteSettings,
}

impl EntityType {
    /// All entity types in registry order
    pub const ALL: &'static [EntityType] = &[
        EntityType::Users,
        EntityType::Properties,
        EntityType::Customers,
        EntityType::Leads,
        EntityType::Appointments,
        EntityType::NewsletterSubscribers,
        EntityType::ActivityLog,
        EntityType::SiteSettings,
    ];

    /// The name used for this type in snapshot documents and the store file
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Users => "users",
            EntityType::Properties => "properties",
            EntityType::Customers => "customers",
            EntityType::Leads => "leads",
            EntityType::Appointments => "appointments",
            EntityType::NewsletterSubscribers => "newsletterSubscribers",
            EntityType::ActivityLog => "activityLog",
            EntityType::SiteSettings => "siteSettings",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown entity type '{}'", s))
    }
}
