use serde::{Serialize, Deserialize};

// Accounts live in an external identity system; only the columns messages
// reference are mirrored here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
}
