//! Organization name reconciliation.
//!
//! Upstream extracts label the same business unit differently ("건자재팀" in
//! the profit plan, "건자재" in the aging ledger). Matching is structural:
//! exact equality on trimmed names first, then the first key (in the
//! mapping's own order) that contains or is contained by the candidate.
//! There is no similarity scoring and no case folding.

use crate::records::OrgScoped;

/// Look up `candidate` in an ordered name → value mapping.
pub fn fuzzy_match<'a, K, V>(mapping: &'a [(K, V)], candidate: &str) -> Option<&'a V>
where
    K: AsRef<str>,
{
    fuzzy_match_entry(mapping, candidate).map(|(_, v)| v)
}

/// Like [`fuzzy_match`] but also returns the matched key.
pub fn fuzzy_match_entry<'a, K, V>(
    mapping: &'a [(K, V)],
    candidate: &str,
) -> Option<(&'a str, &'a V)>
where
    K: AsRef<str>,
{
    let cand = candidate.trim();
    if cand.is_empty() {
        return None;
    }

    if let Some((k, v)) = mapping.iter().find(|(k, _)| k.as_ref().trim() == cand) {
        return Some((k.as_ref(), v));
    }

    mapping
        .iter()
        .find(|(k, _)| {
            let key = k.as_ref().trim();
            !key.is_empty() && (cand.contains(key) || key.contains(cand))
        })
        .map(|(k, v)| (k.as_ref(), v))
}

/// Do two labels refer to the same organization?
pub fn same_org(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

/// Keep the rows whose organization matches any of `names`.
///
/// An empty name set matches nothing; callers wanting "all organizations"
/// should skip the filter.
pub fn filter_by_orgs<T, S>(rows: &[T], names: &[S]) -> Vec<T>
where
    T: OrgScoped + Clone,
    S: AsRef<str>,
{
    rows.iter()
        .filter(|row| {
            let org = row.org().trim();
            !org.is_empty() && names.iter().any(|n| same_org(org, n.as_ref()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SalesRecord;
    use rust_decimal_macros::dec;

    #[test]
    fn test_key_contains_candidate() {
        let map = vec![("건자재팀".to_string(), 1)];
        assert_eq!(fuzzy_match(&map, "건자재"), Some(&1));
    }

    #[test]
    fn test_candidate_contains_key() {
        let map = vec![("건자재".to_string(), 2)];
        assert_eq!(fuzzy_match(&map, "건자재팀"), Some(&2));
    }

    #[test]
    fn test_empty_mapping_not_found() {
        let map: Vec<(String, i32)> = Vec::new();
        assert_eq!(fuzzy_match(&map, "anything"), None);
    }

    #[test]
    fn test_exact_match_wins_over_earlier_containment() {
        let map = vec![("영업1팀".to_string(), 1), ("영업1".to_string(), 2)];
        assert_eq!(fuzzy_match(&map, "영업1"), Some(&2));
    }

    #[test]
    fn test_first_structural_match_in_insertion_order() {
        let map = vec![("Seoul East".to_string(), 1), ("Seoul West".to_string(), 2)];
        assert_eq!(fuzzy_match(&map, "Seoul"), Some(&1));
    }

    #[test]
    fn test_trim_and_case_sensitive() {
        let map = vec![("  Plant A ".to_string(), 7)];
        assert_eq!(fuzzy_match(&map, "Plant A"), Some(&7));
        assert_eq!(fuzzy_match(&map, "plant a"), None);
    }

    #[test]
    fn test_blank_candidate_and_blank_keys() {
        let map = vec![("".to_string(), 1), ("Ops".to_string(), 2)];
        assert_eq!(fuzzy_match(&map, "   "), None);
        // A blank key must not swallow every candidate via containment
        assert_eq!(fuzzy_match(&map, "Ops Team"), Some(&2));
    }

    #[test]
    fn test_same_org_predicate() {
        assert!(same_org("건자재", " 건자재팀 "));
        assert!(same_org("Ops", "Ops"));
        assert!(!same_org("Ops", "Finance"));
        assert!(!same_org("", "Ops"));
    }

    #[test]
    fn test_filter_by_orgs() {
        let rows = vec![
            SalesRecord {
                org: "건자재팀".into(),
                amount: dec!(10),
                ..Default::default()
            },
            SalesRecord {
                org: "철강팀".into(),
                amount: dec!(20),
                ..Default::default()
            },
            SalesRecord {
                org: "".into(),
                amount: dec!(30),
                ..Default::default()
            },
        ];
        let kept = filter_by_orgs(&rows, &["건자재"]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].amount, dec!(10));
        assert!(filter_by_orgs(&rows, &Vec::<String>::new()).is_empty());
    }
}
