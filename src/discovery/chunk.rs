//! Token-budgeted chunking of snapshot lines.
//!
//! Chunks break only between lines, so concatenating the chunks gives back
//! the original line sequence. The one exception is a single line that alone
//! exceeds the budget: it is cut down to fit and sent in a chunk of its own.

/// Rough token count: four ASCII chars per token, one token per other char.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let (ascii, other) = text
        .chars()
        .fold((0usize, 0usize), |(a, o), c| if c.is_ascii() { (a + 1, o) } else { (a, o + 1) });
    ascii.div_ceil(4) + other
}

/// Cost of `line` plus its newline. Summed over lines this never
/// underestimates [`estimate_tokens`] of the joined text.
fn line_cost(line: &str) -> usize {
    let (ascii, other) = line
        .chars()
        .fold((1usize, 0usize), |(a, o), c| if c.is_ascii() { (a + 1, o) } else { (a, o + 1) });
    ascii.div_ceil(4) + other
}

/// Split `lines` into chunks of at most `budget` estimated tokens each.
#[must_use]
pub fn chunk_lines(lines: &[String], budget: usize) -> Vec<Vec<String>> {
    let budget = budget.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut used = 0;

    for line in lines {
        let cost = line_cost(line);
        if cost > budget {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                used = 0;
            }
            chunks.push(vec![truncate_to_budget(line, budget)]);
            continue;
        }
        if used + cost > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(line.clone());
        used += cost;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn truncate_to_budget(line: &str, budget: usize) -> String {
    let mut out = String::new();
    for c in line.chars() {
        out.push(c);
        if line_cost(&out) > budget {
            out.pop();
            break;
        }
    }
    out
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
#[must_use]
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}
