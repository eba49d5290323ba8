//! Key casing helpers.
//!
//! Wire payloads use `snake_case` or `kebab-case` keys; consumers expect
//! `camelCase`. Error codes want `UPPER_SNAKE_CASE` field names.

/// `user_name` / `user-name` → `userName`. Already camel-cased keys are
/// returned unchanged, as are leading and trailing separators (`_id`).
#[must_use]
pub fn to_camel_case(key: &str) -> String {
    let is_separator = |c: char| c == '_' || c == '-';
    let start = key.len() - key.trim_start_matches(is_separator).len();
    let end = key.trim_end_matches(is_separator).len().max(start);

    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..start]);
    let mut upper_next = false;
    for c in key[start..end].chars() {
        if is_separator(c) {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out.push_str(&key[end..]);
    out
}

/// `testField` / `order-dir` / `X-Api-Key` → `TEST_FIELD` / `ORDER_DIR` /
/// `X_API_KEY`.
#[must_use]
pub fn to_upper_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_alphanumeric() {
            let boundary = c.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if boundary {
                out.push('_');
            }
            out.extend(c.to_uppercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(c);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("user_name"), "userName");
        assert_eq!(to_camel_case("user-name"), "userName");
        assert_eq!(to_camel_case("userName"), "userName");
        assert_eq!(to_camel_case("created_at_utc"), "createdAtUtc");
        assert_eq!(to_camel_case("a__b"), "aB");
        assert_eq!(to_camel_case("_id"), "_id");
        assert_eq!(to_camel_case("__"), "__");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_upper_snake_case() {
        assert_eq!(to_upper_snake_case("testField"), "TEST_FIELD");
        assert_eq!(to_upper_snake_case("order-dir"), "ORDER_DIR");
        assert_eq!(to_upper_snake_case("X-Api-Key"), "X_API_KEY");
        assert_eq!(to_upper_snake_case("user_name"), "USER_NAME");
        assert_eq!(to_upper_snake_case("pos"), "POS");
        assert_eq!(to_upper_snake_case("address2Line"), "ADDRESS2_LINE");
    }

    proptest! {
        #[test]
        fn prop_camel_case_is_idempotent(key in "[a-z_-]{0,16}") {
            let once = to_camel_case(&key);
            prop_assert_eq!(to_camel_case(&once), once);
        }
    }
}
