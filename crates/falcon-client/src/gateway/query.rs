use std::fmt::Display;

/// Query-string builder for the row API's filter syntax
/// (`column=op.value`, `order=col.desc`, `or=(a.op.x,b.op.y)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns)
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("neq.{value}"))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("gte.{value}"))
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("lt.{value}"))
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("lte.{value}"))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(column, "is.null")
    }

    /// Excludes rows where `column` is true; nulls pass.
    pub fn not_true(self, column: &str) -> Self {
        self.push(column, "not.is.true")
    }

    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined: Vec<String> = values.into_iter().map(|v| quote(&v.to_string())).collect();
        self.push(column, format!("in.({})", joined.join(",")))
    }

    /// Case-insensitive substring match.
    pub fn ilike(self, column: &str, term: &str) -> Self {
        self.push(column, format!("ilike.{}", contains_pattern(term)))
    }

    /// Any column matching `term` case-insensitively.
    pub fn ilike_any(self, columns: &[&str], term: &str) -> Self {
        let pattern = contains_pattern(term);
        let exprs: Vec<String> = columns
            .iter()
            .map(|c| format!("{c}.ilike.{pattern}"))
            .collect();
        self.push("or", format!("({})", exprs.join(",")))
    }

    pub fn order(self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.push("order", format!("{column}.{dir}"))
    }

    pub fn limit(self, n: u64) -> Self {
        self.push("limit", n.to_string())
    }

    pub fn offset(self, n: u64) -> Self {
        self.push("offset", n.to_string())
    }

    /// Zero-based inclusive row range.
    pub fn range(self, from: u64, to: u64) -> Self {
        self.offset(from).limit(to.saturating_sub(from) + 1)
    }

    pub fn on_conflict(self, columns: &str) -> Self {
        self.push("on_conflict", columns)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn contains_pattern(term: &str) -> String {
    quote(&format!("*{}*", term.trim()))
}

/// Double-quote values holding characters that are reserved inside
/// `in.(...)` and `or=(...)` lists.
fn quote(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ':', '\\']) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filters_in_order() {
        let q = Query::new()
            .select("*")
            .in_list("status", ["new", "in_review"])
            .is_null("assigned_to")
            .order("created_at", false)
            .range(20, 39);
        assert_eq!(
            q.pairs(),
            &[
                ("select".to_string(), "*".to_string()),
                ("status".to_string(), "in.(new,in_review)".to_string()),
                ("assigned_to".to_string(), "is.null".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("offset".to_string(), "20".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn search_terms_are_quoted_when_needed() {
        let q = Query::new().ilike_any(&["address", "city"], " elm ");
        assert_eq!(q.get("or"), Some("(address.ilike.*elm*,city.ilike.*elm*)"));

        let q = Query::new().ilike_any(&["address"], "5th, apt (2)");
        assert_eq!(q.get("or"), Some("(address.ilike.\"*5th, apt (2)*\")"));
    }
}
