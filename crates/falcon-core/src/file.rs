use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Storage bucket holding order attachments.
pub const DEFAULT_BUCKET: &str = "orders";

/// Row of `order_files`: metadata for an object stored in the bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFile {
    pub id: Uuid,
    pub order_id: Uuid,
    pub bucket: String,
    pub path: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Location of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w.\- ]+").expect("static regex"))
}

/// Replace every run of characters outside `[A-Za-z0-9_.- ]` with `_`.
pub fn safe_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "_").into_owned()
}

/// Object key for an attachment: `{org}/{order}/{millis}_{slug}_{safe filename}`.
pub fn storage_path(
    organization_id: Uuid,
    order_id: Uuid,
    uploaded_at: DateTime<Utc>,
    slug: &str,
    filename: &str,
) -> String {
    format!(
        "{}/{}/{}_{}_{}",
        organization_id,
        order_id,
        uploaded_at.timestamp_millis(),
        slug,
        safe_name(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn safe_name_collapses_runs() {
        assert_eq!(safe_name("report (final)#2.pdf"), "report _final_2.pdf");
        assert_eq!(safe_name("plain-name_v1.txt"), "plain-name_v1.txt");
        assert_eq!(safe_name("a/b\\c.png"), "a_b_c.png");
    }

    #[test]
    fn storage_path_layout() {
        let org = Uuid::from_u128(1);
        let order = Uuid::from_u128(2);
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let path = storage_path(org, order, at, "k3j9x0ab", "site photo?.jpg");
        assert_eq!(
            path,
            format!("{org}/{order}/1767225600000_k3j9x0ab_site photo_.jpg")
        );
    }
}
