use crate::error::{CoordinatorError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapInfo {
    pub map_id: String,
    pub map_number: u32,
}

/// The fixed veto pool. Configurable, but the alternating veto sequence
/// assumes at least six entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPool {
    maps: Vec<MapInfo>,
}

impl MapPool {
    pub fn new(maps: Vec<MapInfo>) -> Result<Self> {
        if maps.len() < 6 {
            return Err(CoordinatorError::InvalidConfiguration(format!(
                "map pool needs at least 6 maps, got {}",
                maps.len()
            )));
        }
        Ok(Self { maps })
    }

    /// The shipped seven-map rotation.
    pub fn standard() -> Self {
        let maps = [
            ("quarry", 1),
            ("foundry", 2),
            ("harbor", 3),
            ("outpost", 4),
            ("canal", 5),
            ("ridge", 6),
            ("terminal", 7),
        ]
        .into_iter()
        .map(|(map_id, map_number)| MapInfo {
            map_id: map_id.to_string(),
            map_number,
        })
        .collect();
        Self { maps }
    }

    pub fn maps(&self) -> &[MapInfo] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
