use std::collections::HashSet;

/// Turns a user label into a declaration name.
///
/// Every run of whitespace becomes a single underscore. An empty result falls
/// back to `fallback`, so the function is total for any input.
pub fn sanitize(label: &str, fallback: &str) -> String {
    let mut token = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for c in label.chars() {
        if !c.is_whitespace() {
            token.push(c);
        } else if !in_whitespace {
            token.push('_');
        }
        in_whitespace = c.is_whitespace();
    }

    match (token.is_empty(), fallback.is_empty()) {
        (false, _) => token,
        (true, false) => fallback.to_string(),
        (true, true) => "_".to_string(),
    }
}

/// Names already declared in one generated document.
#[derive(Default)]
pub struct IdentifierSet {
    claimed: HashSet<String>,
}

impl IdentifierSet {
    pub fn new() -> IdentifierSet {
        IdentifierSet::default()
    }

    /// Returns `token` the first time, then `token_2`, `token_3`, ... on collisions.
    pub fn claim(&mut self, token: String) -> String {
        if self.claimed.insert(token.clone()) {
            return token;
        }
        let unique = (2..)
            .map(|n| format!("{token}_{n}"))
            .find(|candidate| !self.claimed.contains(candidate))
            .unwrap_or(token);
        self.claimed.insert(unique.clone());
        unique
    }

    /// Sanitizes and claims in one step.
    pub fn declare(&mut self, label: &str, fallback: &str) -> String {
        self.claim(sanitize(label, fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_whitespace() {
        assert_eq!(sanitize("Play Deck 1", "btn_1"), "Play_Deck_1");
        assert_eq!(sanitize("Play\tNow", "btn_1"), "Play_Now");
    }

    #[test]
    fn test_sanitize_whitespace_runs_collapse() {
        assert_eq!(sanitize("Play   Now", "x"), "Play_Now");
        assert_eq!(sanitize(" Play ", "x"), "_Play_");
    }

    #[test]
    fn test_sanitize_whitespace_only_is_one_underscore() {
        assert_eq!(sanitize("   \t\n", "pot_7"), "_");
    }

    #[test]
    fn test_sanitize_falls_back_when_empty() {
        assert_eq!(sanitize("", "pot_7"), "pot_7");
        assert_eq!(sanitize("", ""), "_");
    }

    #[test]
    fn test_sanitize_is_total() {
        for label in ["", " ", "Ünïcødé Knob", "🎛", "a b", "\u{3000}"] {
            assert!(!sanitize(label, "").is_empty(), "empty token for {label:?}");
            assert!(!sanitize(label, "fallback").is_empty());
        }
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize("Ünï Knob", "x"), "Ünï_Knob");
    }

    #[test]
    fn test_claim_suffixes_collisions() {
        let mut names = IdentifierSet::new();
        assert_eq!(names.declare("Play", "a"), "Play");
        assert_eq!(names.declare("Play", "b"), "Play_2");
        assert_eq!(names.declare("Play", "c"), "Play_3");
    }

    #[test]
    fn test_claim_skips_taken_suffix() {
        let mut names = IdentifierSet::new();
        assert_eq!(names.claim("Play_2".to_string()), "Play_2");
        assert_eq!(names.claim("Play".to_string()), "Play");
        assert_eq!(names.claim("Play".to_string()), "Play_3");
    }
}
