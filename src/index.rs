use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::records::{Category, Record};

/// Read-only lookup maps from category to member tags and records,
/// built in one pass over the dataset. Membership checks are O(1); the
/// list accessors return first-seen order so output is deterministic.
///
/// The dataset never changes at runtime, but the build is a pure
/// function of the record list, so rebuilding after a hypothetical
/// change would keep the contract intact.
#[derive(Debug, Default)]
pub struct SelectionIndex {
    tag_sets: HashMap<Category, HashSet<String>>,
    tag_lists: HashMap<Category, Vec<String>>,
    record_lists: HashMap<Category, Vec<String>>,
}

impl SelectionIndex {
    pub fn build(records: &[Record]) -> Self {
        let mut index = Self::default();

        for record in records {
            let mut categories_on_record = HashSet::new();
            for tag in &record.tags {
                let names = index.tag_sets.entry(tag.category).or_default();
                if names.insert(tag.name.clone()) {
                    index
                        .tag_lists
                        .entry(tag.category)
                        .or_default()
                        .push(tag.name.clone());
                }
                categories_on_record.insert(tag.category);
            }
            for category in categories_on_record {
                index
                    .record_lists
                    .entry(category)
                    .or_default()
                    .push(record.id.clone());
            }
        }

        index
    }

    /// Membership uses the tag's own name: child tags stay distinct
    /// here even when they fold into a parent for sizing.
    pub fn is_tag_in_category(&self, name: &str, category: Category) -> bool {
        self.tag_sets
            .get(&category)
            .is_some_and(|names| names.contains(name))
    }

    pub fn tags_for(&self, category: Category) -> &[String] {
        self.tag_lists
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn records_for(&self, category: Category) -> &[String] {
        self.record_lists
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One slice of the category summary chart.
#[derive(Clone, Debug)]
pub struct CategorySlice {
    pub category: Category,
    pub tag_count: usize,
    pub record_count: usize,
    pub total_months: i64,
}

/// Per-category aggregates behind the summary/pie chart: distinct tag
/// count, member record count, and summed record durations.
pub fn category_summary(records: &[Record], now: NaiveDate) -> Vec<CategorySlice> {
    let index = SelectionIndex::build(records);

    Category::ALL
        .iter()
        .map(|&category| {
            let total_months = records
                .iter()
                .filter(|record| record.has_tag_in(category))
                .map(|record| record.active_months(now))
                .sum();
            CategorySlice {
                category,
                tag_count: index.tags_for(category).len(),
                record_count: index.records_for(category).len(),
                total_months,
            }
        })
        .collect()
}
