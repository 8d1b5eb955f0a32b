use crate::config::SearchMode;
use crate::model::InventoryItem;

/// Items whose name contains `query`, ignoring case. An empty query keeps everything.
///
/// Order is preserved, so filtering a refreshed list keeps it sorted by name.
pub fn filter(items: &[InventoryItem], query: &str) -> Vec<InventoryItem> {
    filter_with(items, query, SearchMode::Name)
}

/// Like [`filter`], optionally also matching against the category.
pub fn filter_with(items: &[InventoryItem], query: &str, mode: SearchMode) -> Vec<InventoryItem> {
    if query.is_empty() {
        return items.to_vec();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| matches(item, &needle, mode))
        .cloned()
        .collect()
}

fn matches(item: &InventoryItem, needle: &str, mode: SearchMode) -> bool {
    if item.name.as_str().to_lowercase().contains(needle) {
        return true;
    }
    mode == SearchMode::NameOrCategory && item.category.to_lowercase().contains(needle)
}
