//! Shared naming helpers
//!
//! Column names arrive as `UPPER_SNAKE` from the metadata store. COBOL
//! wants `UPPER-KEBAB`, Java wants camel/Pascal case.

/// Derive a COBOL-safe name from a raw column name
///
/// # Examples
/// ```
/// use rategen::util::to_cobol_name;
/// assert_eq!(to_cobol_name("policy_no"), "POLICY-NO");
/// ```
pub fn to_cobol_name(column: &str) -> String {
    column.trim().replace('_', "-").to_ascii_uppercase()
}

/// Convert `UPPER_SNAKE` or `snake_case` to PascalCase
///
/// # Examples
/// ```
/// use rategen::util::to_pascal_case;
/// assert_eq!(to_pascal_case("POLICY_NO"), "PolicyNo");
/// assert_eq!(to_pascal_case("PGUOBK3"), "Pguobk3");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-'])
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert `UPPER_SNAKE` or `snake_case` to camelCase
///
/// # Examples
/// ```
/// use rategen::util::to_camel_case;
/// assert_eq!(to_camel_case("BASE_PREM"), "basePrem");
/// ```
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join `parts` with `separator`, starting each continuation on a new
/// line indented by `indent` spaces
pub fn join_continued(parts: &[String], separator: &str, indent: usize) -> String {
    let glue = format!("{}\n{}", separator, " ".repeat(indent));
    parts.join(&glue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cobol_name() {
        assert_eq!(to_cobol_name("BASE_PREM_AMT"), "BASE-PREM-AMT");
        assert_eq!(to_cobol_name(" rate_cd "), "RATE-CD");
        assert_eq!(to_cobol_name(""), "");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("BASE_PREM"), "BasePrem");
        assert_eq!(to_pascal_case("rate_cd"), "RateCd");
        assert_eq!(to_pascal_case("WS-AMT"), "WsAmt");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("POLICY_NO"), "policyNo");
        assert_eq!(to_camel_case("X"), "x");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_join_continued() {
        let parts = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(join_continued(&parts, ",", 2), "A,\n  B,\n  C");
        assert_eq!(join_continued(&parts[..1], ",", 2), "A");
    }
}
