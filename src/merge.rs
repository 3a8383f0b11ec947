//! Incremental merging of market pages into one snapshot

use std::collections::HashSet;

use crate::types::AssetRecord;

/// Merges a fetched page into the existing snapshot
///
/// Page 1 replaces the snapshot wholesale. Later pages append, in their own
/// order, only records whose id is not present yet. Existing records keep
/// their position. Applying the same page twice yields the same snapshot as
/// applying it once.
pub fn merge_page(existing: &[AssetRecord], incoming: Vec<AssetRecord>, page: u32) -> Vec<AssetRecord> {
    if page <= 1 {
        return dedup(Vec::with_capacity(incoming.len()), HashSet::new(), incoming);
    }

    let seen: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
    dedup(existing.to_vec(), seen, incoming)
}

/// Appends records with unseen ids; the first occurrence wins
fn dedup(
    mut snapshot: Vec<AssetRecord>,
    mut seen: HashSet<String>,
    incoming: Vec<AssetRecord>,
) -> Vec<AssetRecord> {
    snapshot.reserve(incoming.len());
    for record in incoming {
        if seen.insert(record.id.clone()) {
            snapshot.push(record);
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str) -> AssetRecord {
        AssetRecord::new(id, id, id)
    }

    fn ids(records: &[AssetRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_page_one_replaces() {
        let existing = vec![rec("a"), rec("b"), rec("z")];
        let page1 = vec![rec("c"), rec("d")];
        assert_eq!(merge_page(&existing, page1.clone(), 1), page1);
        assert_eq!(merge_page(&[], page1.clone(), 1), page1);
    }

    #[test]
    fn test_later_page_appends_unseen() {
        let existing = vec![rec("a"), rec("b")];
        let merged = merge_page(&existing, vec![rec("b"), rec("c"), rec("d")], 2);
        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let snapshot = vec![rec("a"), rec("b")];
        let page = vec![rec("c"), rec("a"), rec("d")];

        let once = merge_page(&snapshot, page.clone(), 2);
        let twice = merge_page(&once, page, 2);
        assert_eq!(once, twice);
        assert_eq!(ids(&twice), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_existing_record_is_not_replaced() {
        let existing = vec![rec("a").with_price(1.0)];
        let merged = merge_page(&existing, vec![rec("a").with_price(2.0)], 3);
        assert_eq!(merged[0].current_price, Some(1.0));
    }

    #[test]
    fn test_duplicates_within_page_collapse() {
        let merged = merge_page(&[], vec![rec("a"), rec("b"), rec("a")], 1);
        assert_eq!(ids(&merged), vec!["a", "b"]);

        let merged = merge_page(&[rec("x")], vec![rec("y"), rec("y")], 2);
        assert_eq!(ids(&merged), vec!["x", "y"]);
    }
}
