/// Collapse every whitespace run to a single space and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape the characters `LIKE`/`ILIKE` treat as wildcards or escapes.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Build the substring pattern used by the roster fallback lookup.
///
/// Each word is escaped so literal `%` and `_` stay literal. Whitespace runs
/// between words become `%` so stored values with doubled or odd whitespace
/// still reach the resolver, which then re-checks the normalized text.
pub fn contains_pattern(raw: &str) -> String {
    let words: Vec<String> = raw.split_whitespace().map(escape_like).collect();
    format!("%{}%", words.join("%"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Literal(char),
    AnyChar,
    AnySequence,
}

fn tokenize(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        let token = match ch {
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Case-insensitive `ILIKE` evaluation with backslash escapes.
pub fn ilike(pattern: &str, text: &str) -> bool {
    let tokens = tokenize(&pattern.to_lowercase());
    let text: Vec<char> = text.to_lowercase().chars().collect();

    // reachable[i]: the tokens seen so far can consume exactly text[..i]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            LikeToken::AnySequence => {
                let mut seen = false;
                for (index, slot) in next.iter_mut().enumerate() {
                    seen |= reachable[index];
                    *slot = seen;
                }
            }
            LikeToken::AnyChar => {
                for index in 0..text.len() {
                    if reachable[index] {
                        next[index + 1] = true;
                    }
                }
            }
            LikeToken::Literal(expected) => {
                for index in 0..text.len() {
                    if reachable[index] && text[index] == expected {
                        next[index + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}
