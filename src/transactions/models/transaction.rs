use serde::{Deserialize, Serialize};

/// A transaction submitted for scoring.
///
/// Field presence and primitive types are enforced by deserialization. Values
/// themselves are passed through unchecked; a negative amount is scored like
/// any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub step: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
}
