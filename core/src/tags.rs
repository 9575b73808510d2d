use crate::span::KeyValue;

/// Result of [`dedupe_tags`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupedTags {
    pub tags: Vec<KeyValue>,
    pub warnings: Vec<String>,
}

/// Drop repeated `(key, value)` pairs, keeping the first occurrence of each.
///
/// A key repeated with a different value is not a duplicate. Each dropped pair
/// yields a `Duplicate tag "<key>:<value>"` warning.
pub fn dedupe_tags(tags: &[KeyValue]) -> DedupedTags {
    let mut result = DedupedTags::default();

    for tag in tags {
        let seen = result
            .tags
            .iter()
            .any(|kept| kept.key == tag.key && kept.value == tag.value);

        if seen {
            result
                .warnings
                .push(format!("Duplicate tag \"{}:{}\"", tag.key, tag.display_value()));
        } else {
            result.tags.push(tag.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_exact_duplicates_in_order() {
        let tags = vec![
            KeyValue::new("span.kind", "server"),
            KeyValue::new("http.status_code", 200),
            KeyValue::new("span.kind", "server"),
            KeyValue::new("http.status_code", 200),
        ];

        let deduped = dedupe_tags(&tags);

        assert_eq!(deduped.tags, tags[..2].to_vec());
        assert_eq!(
            deduped.warnings,
            vec![
                "Duplicate tag \"span.kind:server\"".to_string(),
                "Duplicate tag \"http.status_code:200\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_same_key_different_value_is_kept() {
        let tags = vec![
            KeyValue::new("peer.service", "db"),
            KeyValue::new("peer.service", "cache"),
        ];

        let deduped = dedupe_tags(&tags);

        assert_eq!(deduped.tags.len(), 2);
        assert!(deduped.warnings.is_empty());
    }

    #[test]
    fn test_string_and_number_values_differ() {
        let tags = vec![KeyValue::new("retries", 3), KeyValue::new("retries", "3")];
        assert_eq!(dedupe_tags(&tags).tags.len(), 2);
    }

    #[test]
    fn test_is_idempotent() {
        let tags = vec![
            KeyValue::new("a", "1"),
            KeyValue::new("a", "1"),
            KeyValue::new("b", true),
        ];

        let once = dedupe_tags(&tags);
        let twice = dedupe_tags(&once.tags);

        assert_eq!(twice.tags, once.tags);
        assert!(twice.warnings.is_empty());
    }
}
