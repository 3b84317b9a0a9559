use std::{collections::BTreeSet, hash::Hash};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// Collect the distinct labels seen across all items, in sorted order so that class ids are
/// stable between runs
pub fn label_set<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    labels
        .into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_label_set_is_sorted_and_distinct() {
        let labels: Vec<String> = ["NOUN", "DET", "NOUN", "ADJ"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(label_set(&labels), vec!["ADJ", "DET", "NOUN"]);
    }

    #[test]
    fn test_invert_enumerated_labels() {
        let labels = vec!["ADJ".to_string(), "DET".to_string()];

        let label2id: BTreeMap<String, usize> = invert_map(labels.into_iter().enumerate());

        assert_eq!(label2id.get("DET"), Some(&1));
    }
}
