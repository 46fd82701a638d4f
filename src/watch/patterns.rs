// src/watch/patterns.rs

//! Pattern compilation for `-file` / `-xfile` / `-dir` / `-xdir`.

use regex::Regex;

/// Compile a user-supplied pattern, treating a dot followed by an
/// ASCII letter as a literal dot.
///
/// File-extension patterns are by far the common case, so `.html`
/// matches `header.html` but not `fooxhtml`. Wrapping the dot in a
/// group (`(.)html`) restores the wildcard meaning, and an already
/// escaped dot is left alone.
///
/// A leading `./` is also trimmed: a regex starting with "any
/// character then a slash" never matches a relative path's first
/// component, and `./src/main.go` is invariably meant as
/// `src/main.go`.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let dots = pattern.matches('.').count();
    if dots == 0 {
        return Regex::new(pattern);
    }
    let mut pattern = pattern;
    if pattern.starts_with("./") && pattern.len() > 2 {
        pattern = &pattern[2..];
    }
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + dots);
    for (i, &curr) in chars.iter().enumerate() {
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();
        if curr == '.'
            && prev != Some('\\')
            && matches!(next, Some(c) if c.is_ascii_alphabetic())
        {
            out.push_str("\\.");
        } else {
            out.push(curr);
        }
    }
    Regex::new(&out)
}
