//! Builds the `float_input` row the exported pipeline expects.
//!
//! Column order is fixed by the model export: the six numeric fields as sent
//! on the wire, then one indicator column per known transaction type.

use crate::transactions::models::transaction::Transaction;

/// Transaction types the pipeline was fitted on, in indicator column order.
pub const TRANSACTION_TYPES: [&str; 5] = ["CASH_IN", "CASH_OUT", "DEBIT", "PAYMENT", "TRANSFER"];

pub const FEATURE_COUNT: usize = 6 + TRANSACTION_TYPES.len();

/// Returns one row of `FEATURE_COUNT` values.
///
/// An unrecognized `type` leaves every indicator at zero, the same encoding
/// a one-hot encoder with unknown categories ignored would produce.
pub fn extract(tx: &Transaction) -> Vec<f32> {
    let mut features = Vec::with_capacity(FEATURE_COUNT);

    features.push(tx.step as f32);
    features.push(tx.amount as f32);
    features.push(tx.old_balance_org as f32);
    features.push(tx.new_balance_orig as f32);
    features.push(tx.old_balance_dest as f32);
    features.push(tx.new_balance_dest as f32);

    for kind in TRANSACTION_TYPES {
        features.push(if tx.kind == kind { 1.0 } else { 0.0 });
    }

    features
}
