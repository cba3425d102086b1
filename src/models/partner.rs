//! Partner model
//!
//! Partners are sponsors, supporters and media outlets credited on events.
//! A partner can back many events; an event can list many partners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Partner entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    /// Unique identifier
    pub id: Uuid,
    /// Partner name
    pub name: String,
    /// Kind of partnership
    pub kind: PartnerKind,
    /// Logo URL (image host)
    pub logo_url: Option<String>,
    /// Official website
    pub website: Option<String>,
    /// Whether the partnership is currently active; only active partners
    /// can be linked to events
    pub active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Partner {
    /// Create a new active partner
    pub fn new(name: String, kind: PartnerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            logo_url: None,
            website: None,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Kind of partnership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    /// Financial sponsor
    Sponsor,
    /// General support
    Support,
    /// Media partner
    Media,
    /// Institutional partner
    Institutional,
}

impl PartnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerKind::Sponsor => "sponsor",
            PartnerKind::Support => "support",
            PartnerKind::Media => "media",
            PartnerKind::Institutional => "institutional",
        }
    }
}

impl fmt::Display for PartnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PartnerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sponsor" => Ok(PartnerKind::Sponsor),
            "support" => Ok(PartnerKind::Support),
            "media" => Ok(PartnerKind::Media),
            "institutional" => Ok(PartnerKind::Institutional),
            _ => Err(anyhow::anyhow!("Invalid partner kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_kind_roundtrip() {
        for kind in [
            PartnerKind::Sponsor,
            PartnerKind::Support,
            PartnerKind::Media,
            PartnerKind::Institutional,
        ] {
            assert_eq!(PartnerKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(PartnerKind::from_str("gold").is_err());
    }

    #[test]
    fn test_partner_new_is_active() {
        let partner = Partner::new("Anime Store".into(), PartnerKind::Sponsor);
        assert!(partner.active);
        assert!(partner.logo_url.is_none());
    }
}
