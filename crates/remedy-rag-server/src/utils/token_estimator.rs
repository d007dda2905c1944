/// Token estimation for prompt context budgeting.
/// More accurate than simple char/4 approximation for English prose.

/// Estimate tokens from text using word-based heuristic
/// Rule: avg ~1.3 tokens per word, plus a small formatting overhead
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let words = text.split_whitespace().count();
    ((words as f64 * 1.3) + 5.0).ceil() as usize
}

/// Drop whole lines from the end until the estimate fits `max_tokens`.
pub fn truncate_lines_to_budget(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.lines().collect();
    while !lines.is_empty() && estimate_tokens(&lines.join("\n")) > max_tokens {
        lines.pop();
    }

    lines.join("\n").trim_end().to_string()
}
