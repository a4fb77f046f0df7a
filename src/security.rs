/// Escapes the five HTML-significant characters in a single pass.
///
/// Already-escaped text is escaped again (`&lt;` becomes `&amp;lt;`), so callers
/// must apply this exactly once per write.
pub fn sanitize_input(input: &str) -> String {
    let mut sanitized = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => sanitized.push_str("&lt;"),
            '>' => sanitized.push_str("&gt;"),
            '&' => sanitized.push_str("&amp;"),
            '"' => sanitized.push_str("&quot;"),
            '\'' => sanitized.push_str("&#39;"),
            other => sanitized.push(other),
        }
    }
    sanitized
}
