//! Naming conventions between model fields and table columns.
//!
//! The conventions are intentionally dumb: an uppercased first letter and a
//! special case for the trailing `Id` that database columns spell `ID`.
//! Anything the conventions cannot express goes through a custom column
//! mapper or an explicit field map instead.

/// Field name to conventional column name: `customerId` becomes
/// `CustomerID`.
pub fn tabelize(field: &str) -> String {
    let mut out = ucfirst(field);
    if out.len() > 2 && out.ends_with("Id") {
        out.truncate(out.len() - 2);
        out.push_str("ID");
    }
    out
}

/// Column name back to conventional field name: `CustomerID` becomes
/// `customerId`. Inverse of [`tabelize`].
pub fn modelize(column: &str) -> String {
    let mut out = lcfirst(column);
    if out.len() > 2 && out.ends_with("ID") {
        out.truncate(out.len() - 2);
        out.push_str("Id");
    }
    out
}

pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-insensitive name comparison, used wherever fields and columns meet.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
