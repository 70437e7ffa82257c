//! Admin configuration module for loading the Discord ids allowed to decide help requests.
//!
//! Ids come from `config.toml` and from the comma-separated `ADMIN_USER_IDS`
//! environment variable; both sources are merged.

/// Splits a comma-separated id list, dropping blanks and surrounding whitespace.
#[must_use]
pub fn parse_admin_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Reads `ADMIN_USER_IDS` from the environment, empty when unset.
#[must_use]
pub fn admin_ids_from_env() -> Vec<String> {
    std::env::var("ADMIN_USER_IDS")
        .map(|raw| parse_admin_ids(&raw))
        .unwrap_or_default()
}

/// Merges configured ids with additional ones, keeping first occurrence order.
#[must_use]
pub fn merge_admin_ids(configured: &[String], extra: Vec<String>) -> Vec<String> {
    let mut merged = configured.to_vec();
    for id in extra {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }
    merged
}
