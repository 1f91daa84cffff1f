use serde::{Deserialize, Serialize};

/// A club row, reduced to what role resolution reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Club {
    pub id: String,
    pub name: String,
    pub representative_id: Option<String>,
}
