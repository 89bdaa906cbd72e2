use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::SMALL_MATCH_FLOOR;

/// Per-tenant similarity generation configuration sent with every scheduling
/// request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimilaritySettings {
    pub add_to_index: bool,
    pub auto_exclude_self_matches: bool,
    pub check_internet: bool,
    pub check_publications: bool,
    pub check_submitted_works: bool,
    pub exclude_quotes: bool,
    pub exclude_bibliography: bool,
    /// Matches below this word count are excluded from the report. Clamped to
    /// a floor of 8: values below the floor are silently raised, never
    /// rejected.
    #[serde(deserialize_with = "clamp_small_matches")]
    pub exclude_small_matches: i32,
}

fn clamp_small_matches<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i32::deserialize(deserializer)?;
    Ok(value.max(SMALL_MATCH_FLOOR))
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            add_to_index: true,
            auto_exclude_self_matches: true,
            check_internet: true,
            check_publications: true,
            check_submitted_works: true,
            exclude_quotes: false,
            exclude_bibliography: false,
            exclude_small_matches: SMALL_MATCH_FLOOR,
        }
    }
}

impl SimilaritySettings {
    /// Apply the small-match floor to a caller-supplied value.
    pub fn set_exclude_small_matches(&mut self, value: i32) {
        self.exclude_small_matches = value.max(SMALL_MATCH_FLOOR);
    }
}
