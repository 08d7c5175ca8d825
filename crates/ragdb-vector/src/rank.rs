use std::cmp::Ordering;
use std::collections::HashMap;

use ragdb_core::types::{SearchResult, VectorRecord};

/// Descending score, then ascending id, so equal scores keep a stable order
/// across calls and across engines.
pub(crate) fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}

/// Sorts, then applies the score threshold and the `top_k` limit.
pub(crate) fn finish(mut results: Vec<SearchResult>, top_k: usize, score_threshold: Option<f32>) -> Vec<SearchResult> {
    sort_results(&mut results);
    if let Some(threshold) = score_threshold {
        results.retain(|r| r.score.partial_cmp(&threshold) != Some(Ordering::Less));
    }
    results.truncate(top_k);
    results
}

/// True when `sorted` is a full page whose lowest score still equals the score
/// at the `top_k` cutoff, so more points with that score may exist beyond it.
pub(crate) fn tie_spills_past_page(sorted: &[SearchResult], top_k: usize, limit: usize) -> bool {
    if top_k == 0 || sorted.len() < limit || sorted.len() < top_k {
        return false;
    }
    let cutoff = sorted[top_k - 1].score;
    sorted.last().is_some_and(|last| last.score.total_cmp(&cutoff) == Ordering::Equal)
}

/// Collapses repeated ids to the last occurrence, at the first occurrence's position.
pub(crate) fn dedupe_last_wins(records: Vec<VectorRecord>) -> Vec<VectorRecord> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<VectorRecord> = Vec::with_capacity(records.len());
    for record in records {
        match slots.get(&record.id) {
            Some(&i) => out[i] = record,
            None => {
                slots.insert(record.id.clone(), out.len());
                out.push(record);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::types::Payload;

    fn hit(id: &str, score: f32) -> SearchResult {
        SearchResult { id: id.into(), score, payload: Payload::new() }
    }

    #[test]
    fn tie_at_cutoff_on_a_full_page_spills() {
        let mut page = vec![hit("x", 0.9), hit("y", 0.5), hit("z", 0.5)];
        sort_results(&mut page);
        assert!(tie_spills_past_page(&page, 2, 3));
        assert!(!tie_spills_past_page(&page, 2, 4), "short page holds every point");
        assert!(!tie_spills_past_page(&page, 1, 3), "cutoff score is above the page floor");
    }

    #[test]
    fn ties_break_by_id() {
        let out = finish(vec![hit("b", 0.5), hit("c", 0.9), hit("a", 0.5)], 10, None);
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn threshold_is_inclusive_and_limit_applies() {
        let out = finish(vec![hit("a", 0.5), hit("b", 0.49), hit("c", 0.7)], 1, Some(0.5));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "c");
        let out = finish(vec![hit("a", 0.5), hit("b", 0.49)], 5, Some(0.5));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn later_duplicates_win() {
        let r = |id: &str, x: f32| VectorRecord::new(id, vec![x], Payload::new());
        let out = dedupe_last_wins(vec![r("x", 1.0), r("y", 2.0), r("x", 3.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "x");
        assert_eq!(out[0].vector, vec![3.0]);
    }
}
