//! Free text to ticker symbol.
//!
//! Precedence, first match wins: alias table, exact symbol, exact company name, company-name
//! substring (first row in membership order), then the uppercased input. Resolution never fails;
//! an unmatched query is passed through and fails later, at fetch time, if it is not a ticker.

mod aliases;

pub use aliases::AliasTable;

use crate::domain::MembershipRow;

pub fn resolve(input: &str, membership: Option<&[MembershipRow]>) -> String {
    resolve_with(input, &AliasTable::builtin(), membership)
}

pub fn resolve_with(
    input: &str,
    aliases: &AliasTable<'_>,
    membership: Option<&[MembershipRow]>,
) -> String {
    let query = input.trim();
    if query.is_empty() {
        return String::new();
    }

    if let Some(ticker) = aliases.lookup(query) {
        return ticker.to_string();
    }

    if let Some(rows) = membership {
        let needle = query.to_lowercase();

        if let Some(row) = rows.iter().find(|r| r.symbol.to_lowercase() == needle) {
            return row.symbol.clone();
        }
        if let Some(row) = rows.iter().find(|r| r.name.to_lowercase() == needle) {
            return row.symbol.clone();
        }
        if let Some(row) = rows.iter().find(|r| r.name.to_lowercase().contains(&needle)) {
            return row.symbol.clone();
        }
    }

    query.to_uppercase()
}
