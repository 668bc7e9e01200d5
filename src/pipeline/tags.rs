use std::collections::HashMap;

/// Distinct tags by descending frequency; ties keep first-seen order.
pub fn aggregate<I, T, S>(tag_sets: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for tags in tag_sets {
        for tag in tags {
            let tag = tag.as_ref();
            match counts.get_mut(tag) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(tag.to_string(), 1);
                    order.push(tag.to_string());
                }
            }
        }
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_frequent_first_ties_by_first_seen() {
        let window = vec![
            vec!["#b", "#a"],
            vec!["#c", "#a"],
            vec!["#c"],
            vec![],
            vec!["#d", "#a"],
        ];
        assert_eq!(aggregate(window), ["#a", "#c", "#b", "#d"]);
    }

    #[test]
    fn empty_window_has_no_tags() {
        assert!(aggregate(Vec::<Vec<String>>::new()).is_empty());
    }
}
