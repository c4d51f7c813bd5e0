/// Collapses every run of two or more whitespace characters into a single
/// ASCII space. A lone whitespace character is left as-is.
///
/// This is the payee identity normalization: applied before any comparison
/// (duplicate detection, rule matching, reverse lookup) and never before
/// storing an override key, which keeps the payee exactly as uploaded.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}
