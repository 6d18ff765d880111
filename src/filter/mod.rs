mod cache;
mod matcher;

pub use cache::{DEFAULT_CAPACITY, FilterCache};
pub use matcher::WordMatcher;

use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::index::SelectionIndex;
use crate::records::{Category, Record};

/// Return the records matching a free-text query and optional category,
/// preserving dataset order. Matching is whole-word and
/// case-insensitive over tag names and the record's search fields.
///
/// The selection index is an optimization only: gating through it and
/// gating by direct tag scan must agree.
pub fn filter_records<'r>(
    records: &'r [Record],
    query: &str,
    category: Option<Category>,
    index: Option<&SelectionIndex>,
) -> Vec<&'r Record> {
    let query = query.trim();

    let passes_gate = |record: &Record| match category {
        None => true,
        Some(category) => match index {
            Some(index) => record
                .tags
                .iter()
                .any(|tag| index.is_tag_in_category(&tag.name, category)),
            None => record.has_tag_in(category),
        },
    };

    // A query that just names the selected category adds nothing beyond
    // the gate.
    let names_category = category.is_some_and(|category| query.eq_ignore_ascii_case(category.label()));
    if query.is_empty() || names_category {
        return records.iter().filter(|record| passes_gate(record)).collect();
    }

    let matcher = WordMatcher::new(query);
    records
        .iter()
        .filter(|record| {
            passes_gate(record)
                && (record.tags.iter().any(|tag| matcher.is_match(&tag.name))
                    || record.search_fields().any(|field| matcher.is_match(field)))
        })
        .collect()
}

/// Cache-backed variant of [`filter_records`]. A hit replays the stored
/// id list against the (immutable) record slice; a miss computes and
/// stores. Results are identical to the direct path either way.
pub fn filter_records_cached<'r>(
    records: &'r [Record],
    query: &str,
    category: Option<Category>,
    index: Option<&SelectionIndex>,
    cache: &mut FilterCache,
) -> Vec<&'r Record> {
    let key = FilterCache::key(query.trim(), category);

    if let Some(ids) = cache.get(&key) {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        return records
            .iter()
            .filter(|record| wanted.contains(record.id.as_str()))
            .collect();
    }

    let matches = filter_records(records, query, category, index);
    cache.insert(key, matches.iter().map(|record| record.id.clone()).collect());
    matches
}

/// Closest tag name to a query that matched nothing, for a "did you
/// mean" hint. Fuzzy, so it never participates in filter semantics.
pub fn suggest_tag(records: &[Record], query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let matcher = SkimMatcherV2::default();
    let mut seen = HashSet::new();
    let mut best: Option<(i64, &str)> = None;

    for record in records {
        for tag in &record.tags {
            if !seen.insert(tag.name.as_str()) {
                continue;
            }
            let score = matcher.fuzzy_match(&tag.name, query).or_else(|| {
                matcher.fuzzy_match(&tag.name.to_ascii_lowercase(), &query.to_ascii_lowercase())
            });
            if let Some(score) = score
                && best.is_none_or(|(top, _)| score > top)
            {
                best = Some((score, tag.name.as_str()));
            }
        }
    }

    best.map(|(_, name)| name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::records::Tag;

    fn tag(name: &str, category: Category) -> Tag {
        Tag {
            name: name.to_owned(),
            category,
            parent: None,
        }
    }

    fn record(id: &str, role: &str, summary: &str, tags: Vec<Tag>) -> Record {
        Record {
            id: id.to_owned(),
            role: role.to_owned(),
            organization: "Acme".to_owned(),
            summary: summary.to_owned(),
            highlights: Vec::new(),
            stack_note: None,
            tags,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: None,
        }
    }

    fn fixture() -> Vec<Record> {
        vec![
            record(
                "r1",
                "Backend Engineer",
                "Services in Rust",
                vec![tag("Rust", Category::Language)],
            ),
            record(
                "r2",
                "Full-stack Engineer",
                "Vue, Redux and a Rust API",
                vec![
                    tag("Rust", Category::Language),
                    tag("Vue", Category::Frontend),
                ],
            ),
            record(
                "r3",
                "Frontend Engineer",
                "Reactive dashboards",
                vec![tag("TypeScript", Category::Language)],
            ),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|record| record.id.clone()).collect()
    }

    #[test]
    fn whole_word_match_over_tags_and_fields() {
        let records = fixture();
        // "Reactive" in r3's summary must not match the query "React".
        assert!(filter_records(&records, "React", None, None).is_empty());
        // Word match inside a punctuated summary field.
        assert_eq!(ids(&filter_records(&records, "Vue", None, None)), ["r2"]);
        assert_eq!(
            ids(&filter_records(&records, "rust", None, None)),
            ["r1", "r2"]
        );
    }

    #[test]
    fn empty_query_returns_gate_passers_in_order() {
        let records = fixture();
        assert_eq!(
            ids(&filter_records(&records, "", None, None)),
            ["r1", "r2", "r3"]
        );
        assert_eq!(
            ids(&filter_records(&records, "  ", Some(Category::Frontend), None)),
            ["r2"]
        );
    }

    #[test]
    fn query_naming_the_category_collapses_to_the_gate() {
        let records = fixture();
        // "frontend" appears in no field of r2, but the gate alone decides.
        assert_eq!(
            ids(&filter_records(
                &records,
                "Frontend",
                Some(Category::Frontend),
                None
            )),
            ["r2"]
        );
    }

    #[test]
    fn indexed_and_direct_gates_agree() {
        let records = fixture();
        let index = SelectionIndex::build(&records);
        for category in Category::ALL {
            for query in ["", "Rust", "Engineer", "nothing-matches"] {
                assert_eq!(
                    ids(&filter_records(&records, query, Some(category), Some(&index))),
                    ids(&filter_records(&records, query, Some(category), None)),
                    "gate mismatch for {query:?} in {category}"
                );
            }
        }
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let records = fixture();
        let first = ids(&filter_records(&records, "Rust", None, None));
        let second = ids(&filter_records(&records, "Rust", None, None));
        assert_eq!(first, second);
    }

    #[test]
    fn cached_path_equals_direct_path() {
        let records = fixture();
        let index = SelectionIndex::build(&records);
        let mut cache = FilterCache::default();

        for (query, category) in [
            ("Rust", None),
            ("Rust", Some(Category::Language)),
            ("Vue", None),
            ("", Some(Category::Frontend)),
            ("Rust", None), // replay a hit
        ] {
            let direct = ids(&filter_records(&records, query, category, Some(&index)));
            let cached = ids(&filter_records_cached(
                &records,
                query,
                category,
                Some(&index),
                &mut cache,
            ));
            assert_eq!(direct, cached, "cache diverged for {query:?}/{category:?}");
        }
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn work_history_scenario_filter_order() {
        let records = fixture();
        let matches = filter_records(&records, "Rust", None, None);
        assert_eq!(ids(&matches), ["r1", "r2"]);
    }

    #[test]
    fn suggestion_recovers_near_misses() {
        let records = fixture();
        assert_eq!(suggest_tag(&records, "Rst"), Some("Rust".to_owned()));
        assert_eq!(suggest_tag(&records, ""), None);
    }
}
