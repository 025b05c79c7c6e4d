use serde::{Deserialize, Serialize};

/// Search results and member listings are paginated in pages of 50.
pub const PAGE_SIZE: i64 = 50;

pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1) * PAGE_SIZE
}

/// The profile fields safe to show to any authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicUser {
    pub id: String,
    pub username: Option<String>,
    pub image: Option<String>,
}

// Army list payloads are stored as JSONB and treated as opaque by most of
// the backend. The structures below cover the parts the game engine needs:
// the army name and the unit composition used for model counting. Field
// names are camelCase because the payload is produced by the client.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUnit {
    pub name: String,
    #[serde(default)]
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroup {
    pub leader: Option<ListUnit>,
    #[serde(default)]
    pub members: Vec<ListUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBody {
    pub army: Option<String>,
    #[serde(default)]
    pub groups: Vec<ListGroup>,
}

impl ListBody {
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// The army name, used in the reduced game listing.
    pub fn army_of(value: &serde_json::Value) -> Option<String> {
        Self::parse(value).and_then(|l| l.army)
    }

    /// Total models in the list: one leader per group plus the quantity of
    /// every unit entry. Establishes the pool tracked by
    /// `model_count_remaining` once a game starts.
    pub fn count_models(&self) -> i32 {
        self.groups
            .iter()
            .map(|g| 1 + g.members.iter().map(|m| m.amount).sum::<i32>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_offset_clamps_to_first_page() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 100);
    }

    #[test]
    fn model_count_includes_leaders() {
        let list = ListBody::parse(&json!({
            "army": "Sky Dwarves",
            "groups": [
                { "leader": { "name": "Captain", "amount": 1 },
                  "members": [
                      { "name": "Riflemen", "amount": 5 },
                      { "name": "Gyrocopter", "amount": 2 }
                  ] },
                { "leader": { "name": "Runesmith", "amount": 1 }, "members": [] }
            ]
        }))
        .unwrap();

        // 1 + 5 + 2 for the first group, 1 for the second
        assert_eq!(list.count_models(), 9);
    }

    #[test]
    fn army_extraction_survives_unknown_fields() {
        let value = json!({ "army": "Greenskins", "points": 500, "extras": true });
        assert_eq!(ListBody::army_of(&value).as_deref(), Some("Greenskins"));
    }
}
