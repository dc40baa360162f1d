//! Case-insensitive glob matching for `matches` predicates.

/// Check if a glob pattern matches a value.
/// Supports wildcards: * (matches any sequence) and ? (matches single char).
pub(crate) fn glob_matches(pattern: &str, value: &str) -> bool {
    let mut p_iter = pattern.chars();
    let mut v_iter = value.chars();

    let mut p_star: Option<std::str::Chars> = None;
    // Point in the value to backtrack to after the last star.
    let mut v_star_iter: std::str::Chars = "".chars();

    loop {
        let p_char_opt = p_iter.clone().next();
        let Some(v_char) = v_iter.clone().next() else {
            break;
        };

        match p_char_opt {
            Some('*') => {
                p_iter.next();
                p_star = Some(p_iter.clone());
                v_star_iter = v_iter.clone();
            }
            Some(p_char) if p_char == '?' || chars_eq(p_char, v_char) => {
                p_iter.next();
                v_iter.next();
            }
            // Mismatch or pattern exhausted: retry one character further
            // along from the last star.
            _ => {
                let Some(p_retry) = p_star.clone() else {
                    return false;
                };
                if v_star_iter.next().is_none() {
                    return false;
                }
                p_iter = p_retry;
                v_iter = v_star_iter.clone();
            }
        }
    }

    while p_iter.clone().next() == Some('*') {
        p_iter.next();
    }
    p_iter.next().is_none()
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("*", "anything"));
        assert!(glob_matches("a*b", "ab"));
        assert!(glob_matches("a*b", "acccb"));
        assert!(!glob_matches("a*b", "acbc"));
        assert!(glob_matches("?test", "atest"));
        assert!(!glob_matches("?test", "test"));
        assert!(glob_matches("release-*", "RELEASE-1.0"));
        assert!(glob_matches("*a*b", "zaazb"));
        assert!(!glob_matches("*a*b", "zazc"));
        assert!(glob_matches("src/*.rs", "src/lib.rs"));
        assert!(glob_matches("", ""));
        assert!(glob_matches("*", ""));
        assert!(!glob_matches("", "a"));
        assert!(!glob_matches("abc", "ab"));
    }
}
