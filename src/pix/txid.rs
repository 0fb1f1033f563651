use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Provider-imposed bounds for cob txids.
pub const MIN_LEN: usize = 26;
pub const MAX_LEN: usize = 35;

/// Generates a unique, provider-compliant txid: 32 hex chars from a v4 uuid
/// plus 3 random alphanumeric chars, 35 chars total.
pub fn generate() -> String {
    let core = Uuid::new_v4().simple().to_string();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MAX_LEN - core.len())
        .map(char::from)
        .collect();
    format!("{core}{suffix}")
}

pub fn is_valid(txid: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&txid.len())
        && txid.bytes().all(|b| b.is_ascii_alphanumeric())
}
