//! Filter expressions for instance lookups
//!
//! The Compute API accepts a filter made of parenthesized predicates joined
//! with `OR`, and caps how many predicates a single request may carry.

/// Field holding an instance's primary private address
pub const IP_FILTER_FIELD: &str = "networkInterfaces.networkIP";

/// Field holding an instance's name (used as its ID)
pub const ID_FILTER_FIELD: &str = "name";

/// Build `(field = "v1") OR (field = "v2") OR ...`
pub fn build_filter(field: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("({} = \"{}\")", field, escape_value(v)))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Split lookup keys into chunks of at most `max_predicates`
pub fn chunk_values(values: &[String], max_predicates: usize) -> std::slice::Chunks<'_, String> {
    values.chunks(max_predicates.max(1))
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
