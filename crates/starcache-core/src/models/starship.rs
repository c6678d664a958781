use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A starship record as stored in the remote table.
///
/// Ids are strings: server-assigned ids and the synthetic `temp_<millis>`
/// ids minted for offline inserts share this field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Starship {
    pub id: String,
    pub name: String,
    pub faction: Option<String>,
    pub corporation: Option<String>,
    #[serde(rename = "shipClass")]
    pub ship_class: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "shieldPoints")]
    pub shield_points: Option<i64>,
    #[serde(rename = "hullPoints")]
    pub hull_points: Option<i64>,
    pub armaments: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Starship {
    /// Case-insensitive substring match across the four searchable text
    /// columns. Any single column matching qualifies the record.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        contains_ignore_case(Some(&self.name), &query)
            || contains_ignore_case(self.faction.as_ref(), &query)
            || contains_ignore_case(self.corporation.as_ref(), &query)
            || contains_ignore_case(self.ship_class.as_ref(), &query)
    }
}

fn contains_ignore_case(field: Option<&String>, lowered_query: &str) -> bool {
    field
        .map(|v| v.to_lowercase().contains(lowered_query))
        .unwrap_or(false)
}

/// Payload for inserting a new starship. The backend assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarshipDraft {
    pub name: String,
    pub faction: Option<String>,
    pub corporation: Option<String>,
    #[serde(rename = "shipClass")]
    pub ship_class: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "shieldPoints")]
    pub shield_points: Option<i64>,
    #[serde(rename = "hullPoints")]
    pub hull_points: Option<i64>,
    pub armaments: Option<String>,
    pub description: Option<String>,
}

impl StarshipDraft {
    /// Build a full record from this draft with the given id and the
    /// current time as a placeholder creation time. Used for optimistic
    /// offline inserts.
    pub fn into_starship(self, id: impl Into<String>) -> Starship {
        Starship {
            id: id.into(),
            name: self.name,
            faction: self.faction,
            corporation: self.corporation,
            ship_class: self.ship_class,
            image: self.image,
            shield_points: self.shield_points,
            hull_points: self.hull_points,
            armaments: self.armaments,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

/// A partial update. `None` fields are left untouched and are skipped on
/// serialization, so the wire payload carries only the changed columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StarshipPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corporation: Option<String>,
    #[serde(rename = "shipClass", skip_serializing_if = "Option::is_none")]
    pub ship_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "shieldPoints", skip_serializing_if = "Option::is_none")]
    pub shield_points: Option<i64>,
    #[serde(rename = "hullPoints", skip_serializing_if = "Option::is_none")]
    pub hull_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armaments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StarshipPatch {
    /// Merge this patch into an existing record.
    pub fn apply_to(&self, ship: &mut Starship) {
        if let Some(ref name) = self.name {
            ship.name = name.clone();
        }
        if self.faction.is_some() {
            ship.faction = self.faction.clone();
        }
        if self.corporation.is_some() {
            ship.corporation = self.corporation.clone();
        }
        if self.ship_class.is_some() {
            ship.ship_class = self.ship_class.clone();
        }
        if self.image.is_some() {
            ship.image = self.image.clone();
        }
        if self.shield_points.is_some() {
            ship.shield_points = self.shield_points;
        }
        if self.hull_points.is_some() {
            ship.hull_points = self.hull_points;
        }
        if self.armaments.is_some() {
            ship.armaments = self.armaments.clone();
        }
        if self.description.is_some() {
            ship.description = self.description.clone();
        }
    }

    /// Project the patch onto an otherwise-empty record with the given id.
    /// This is what an offline update returns when there is no cached
    /// record to merge into.
    pub fn into_starship(self, id: impl Into<String>) -> Starship {
        let mut ship = Starship {
            id: id.into(),
            name: String::new(),
            faction: None,
            corporation: None,
            ship_class: None,
            image: None,
            shield_points: None,
            hull_points: None,
            armaments: None,
            description: None,
            created_at: Utc::now(),
        };
        self.apply_to(&mut ship);
        ship
    }
}

// ============================================================================
// Tests
// ============================================================================
