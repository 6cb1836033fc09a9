//! Local child/user identities that scope projects and telemetry.

use super::id::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProfileId = String;

/// Well-known id of the profile that always exists and cannot be deleted.
pub const DEFAULT_PROFILE_ID: &str = "profile-default";

const DEFAULT_DISPLAY_NAME: &str = "Creator";

/// Age band of a profile. Ordered from youngest to oldest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Toddlers,
    #[default]
    YoungCreators,
    Tweens,
    Teens,
}

impl AgeBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBand::Toddlers => "toddlers",
            AgeBand::YoungCreators => "young_creators",
            AgeBand::Tweens => "tweens",
            AgeBand::Teens => "teens",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Toddlers, Self::YoungCreators, Self::Tweens, Self::Teens]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub display_name: String,
    #[serde(default)]
    pub age_band: AgeBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may supply when creating a profile.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub display_name: Option<String>,
    pub age_band: Option<AgeBand>,
    pub avatar_id: Option<String>,
    pub color: Option<String>,
}

/// Partial update for a profile. `None` keeps the existing value.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub age_band: Option<AgeBand>,
    pub avatar_id: Option<String>,
    pub color: Option<String>,
}

fn ensure_name(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => DEFAULT_DISPLAY_NAME.to_string(),
    }
}

impl Profile {
    /// Builds a profile with a fresh id (or `id` when given) and both timestamps set to now.
    pub fn build(payload: NewProfile, id: Option<ProfileId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.unwrap_or_else(|| new_id("profile")),
            display_name: ensure_name(payload.display_name.as_deref()),
            age_band: payload.age_band.unwrap_or_default(),
            avatar_id: payload.avatar_id,
            color: payload.color,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn default_profile() -> Self {
        Self::build(
            NewProfile {
                display_name: Some("First Creator".to_string()),
                age_band: Some(AgeBand::YoungCreators),
                ..Default::default()
            },
            Some(DEFAULT_PROFILE_ID.to_string()),
        )
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_PROFILE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fall_back_to_creator() {
        let p = Profile::build(
            NewProfile {
                display_name: Some("   ".into()),
                ..Default::default()
            },
            None,
        );
        assert_eq!(p.display_name, "Creator");
        assert_eq!(p.age_band, AgeBand::YoungCreators);
        assert!(p.id.starts_with("profile_"));
    }

    #[test]
    fn age_bands_are_ordered() {
        assert!(AgeBand::Toddlers < AgeBand::YoungCreators);
        assert!(AgeBand::Tweens < AgeBand::Teens);
    }

    #[test]
    fn default_profile_uses_well_known_id() {
        let p = Profile::default_profile();
        assert!(p.is_default());
        assert_eq!(p.display_name, "First Creator");
    }
}
