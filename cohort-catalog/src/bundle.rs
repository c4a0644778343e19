use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::catalog::CatalogError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Draft,
    Active,
    Expired,
}

impl BundleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleStatus::Draft => "draft",
            BundleStatus::Active => "active",
            BundleStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundleStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BundleStatus::Draft),
            "active" => Ok(BundleStatus::Active),
            "expired" => Ok(BundleStatus::Expired),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// A fixed-price package of events plus its replacement pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleDefinition {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price_nis: i64,
    /// Member events in declaration order.
    pub event_ids: Vec<Uuid>,
    /// Spare events, scanned in declaration order when a member is unavailable.
    pub replacement_event_ids: Vec<Uuid>,
    pub valid_until: Option<DateTime<Utc>>,
    pub publish: bool,
    pub lifecycle_status: BundleStatus,
    pub created_at: DateTime<Utc>,
}

/// Operator input for creating or re-defining a bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBundle {
    pub title: String,
    pub description: Option<String>,
    pub price_nis: i64,
    pub event_ids: Vec<Uuid>,
    #[serde(default)]
    pub replacement_event_ids: Vec<Uuid>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default = "default_bundle_status")]
    pub lifecycle_status: BundleStatus,
}

fn default_bundle_status() -> BundleStatus {
    BundleStatus::Draft
}

impl BundleDefinition {
    pub fn create(input: NewBundle) -> Result<Self, CatalogError> {
        let bundle = Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            price_nis: input.price_nis,
            event_ids: input.event_ids,
            replacement_event_ids: input.replacement_event_ids,
            valid_until: input.valid_until,
            publish: input.publish,
            lifecycle_status: input.lifecycle_status,
            created_at: Utc::now(),
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Replace the content of an existing bundle, keeping its identity.
    pub fn redefine(&self, input: NewBundle) -> Result<Self, CatalogError> {
        let mut bundle = Self::create(input)?;
        bundle.id = self.id;
        bundle.created_at = self.created_at;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.is_empty() {
            return Err(CatalogError::InvalidBundle("title is required".to_string()));
        }
        if self.price_nis < 0 {
            return Err(CatalogError::InvalidBundle(format!(
                "price must not be negative: {}",
                self.price_nis
            )));
        }
        if self.event_ids.is_empty() {
            return Err(CatalogError::InvalidBundle("a bundle needs at least one event".to_string()));
        }

        let mut members = HashSet::new();
        for id in &self.event_ids {
            if !members.insert(*id) {
                return Err(CatalogError::InvalidBundle(format!("event {} listed twice", id)));
            }
        }

        let mut spares = HashSet::new();
        for id in &self.replacement_event_ids {
            if members.contains(id) {
                return Err(CatalogError::InvalidBundle(format!(
                    "event {} is both a member and a replacement",
                    id
                )));
            }
            if !spares.insert(*id) {
                return Err(CatalogError::InvalidBundle(format!("replacement {} listed twice", id)));
            }
        }

        Ok(())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until < now)
    }

    /// Members followed by replacements.
    pub fn all_event_ids(&self) -> Vec<Uuid> {
        self.event_ids
            .iter()
            .chain(self.replacement_event_ids.iter())
            .copied()
            .collect()
    }
}
