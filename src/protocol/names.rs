/// Longest valid topic or channel name, suffix included.
pub const MAX_NAME_LENGTH: usize = 64;

/// Marks a topic or channel that never touches disk.
pub const EPHEMERAL_SUFFIX: &str = "#ephemeral";

pub fn is_valid_topic_name(name: &str) -> bool {
    is_valid_name(name)
}

pub fn is_valid_channel_name(name: &str) -> bool {
    is_valid_name(name)
}

/// `true` when `name` ends with [`EPHEMERAL_SUFFIX`].
pub fn is_ephemeral(name: &str) -> bool {
    name.ends_with(EPHEMERAL_SUFFIX)
}

/// Queue name of a channel, unique across topics.
pub fn backend_name(
    topic: &str,
    channel: &str,
) -> String {
    format!("{topic}:{channel}")
}

/// 1..=64 bytes of `[A-Za-z0-9._-]`, optionally followed by `#ephemeral`.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    let base = name.strip_suffix(EPHEMERAL_SUFFIX).unwrap_or(name);
    !base.is_empty()
        && base
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("orders", true)]
    #[case("orders.v2_eu-west", true)]
    #[case("reports#ephemeral", true)]
    #[case("a", true)]
    #[case("", false)]
    #[case("#ephemeral", false)]
    #[case("bad name!", false)]
    #[case("orders#ephemeral#ephemeral", false)]
    #[case("orders#other", false)]
    #[case("tópico", false)]
    fn test_name_rule(
        #[case] name: &str,
        #[case] valid: bool,
    ) {
        assert_eq!(is_valid_topic_name(name), valid, "{name:?}");
        assert_eq!(is_valid_channel_name(name), valid, "{name:?}");
    }

    /// The suffix counts towards the length limit.
    #[test]
    fn test_length_limit_includes_suffix() {
        let exact = "a".repeat(MAX_NAME_LENGTH);
        assert!(is_valid_topic_name(&exact));
        assert!(!is_valid_topic_name(&format!("{exact}a")));

        let base = "a".repeat(MAX_NAME_LENGTH - EPHEMERAL_SUFFIX.len());
        assert!(is_valid_topic_name(&format!("{base}{EPHEMERAL_SUFFIX}")));
        assert!(!is_valid_topic_name(&format!("{base}a{EPHEMERAL_SUFFIX}")));
    }

    #[test]
    fn test_ephemeral_and_backend_name() {
        assert!(is_ephemeral("reports#ephemeral"));
        assert!(!is_ephemeral("reports"));
        assert_eq!(backend_name("orders", "billing"), "orders:billing");
    }

    proptest! {
        /// Every string built from the allowed alphabet within the limit is
        /// accepted, with or without the suffix.
        #[test]
        fn prop_alphabet_names_are_valid(base in "[A-Za-z0-9._-]{1,54}") {
            prop_assert!(is_valid_topic_name(&base));
            let ephemeral = format!("{base}{EPHEMERAL_SUFFIX}");
            prop_assert!(is_valid_channel_name(&ephemeral));
            prop_assert!(is_ephemeral(&ephemeral));
        }

        /// Any character outside the alphabet makes the name invalid.
        #[test]
        fn prop_foreign_characters_are_rejected(
            prefix in "[a-z]{0,10}",
            bad in "[ !@$%^&*()+=/\\\\:;,?]",
            suffix in "[a-z]{0,10}",
        ) {
            let name = format!("{prefix}{bad}{suffix}");
            prop_assert!(!is_valid_topic_name(&name));
        }
    }
}
