use std::collections::BTreeSet;

/// `order_purchase_timestamp` → `Order Purchase Timestamp`.
///
/// A letter is upper-cased when the previous character is not a letter, so
/// `address_line2b` becomes `Address Line2B`.
pub fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for c in name.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Lowercase `[a-z0-9_]` identifier starting with a letter.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars().flat_map(|c| c.to_lowercase()) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    match trimmed.chars().next() {
        None => "col".to_string(),
        Some(c) if !c.is_ascii_lowercase() => format!("col_{}", trimmed),
        Some(_) => trimmed.to_string(),
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quotes an identifier when PostgreSQL would otherwise fold or reject it.
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Column reference relative to the cube's own table.
pub fn cube_column(column: &str) -> String {
    format!("{{CUBE}}.{}", quote_identifier(column))
}

/// Member names already used within one cube.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: BTreeSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Claims `preferred`, or `preferred_2`, `preferred_3`, ... if taken.
    pub fn claim(&mut self, preferred: &str) -> String {
        let name = self.next_free(preferred);
        self.taken.insert(name.clone());
        name
    }

    /// Measures that collide are prefixed with their aggregation kind first.
    pub fn claim_measure(&mut self, preferred: &str, kind: &str) -> String {
        if !self.contains(preferred) {
            return self.claim(preferred);
        }
        let prefixed = format!("{}_{}", kind, preferred);
        self.claim(&prefixed)
    }

    fn next_free(&self, preferred: &str) -> String {
        if !self.contains(preferred) {
            return preferred.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", preferred, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| preferred.to_string())
    }
}
