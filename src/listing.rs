// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Tab-Delimited Listing Parser
//!
//! `rabbitmqctl list_*` commands print one row per entity, the key and its values
//! separated by tabs, framed by banner lines such as `Listing permissions ...`
//! and `...done.`. This module strips the framing and turns rows into maps.

use std::collections::BTreeMap;
use tracing::debug;

/// Returns false for banner and warning lines that are not listing rows.
fn is_listing_row(line: &str) -> bool {
    !((line.starts_with("Listing") && line.ends_with("..."))
        || line.contains("...done")
        || line.starts_with("WARNING:"))
}

/// Drops the banner and warning lines of a `rabbitmqctl` listing.
pub fn strip_listing_to_done(output: &str) -> Vec<&str> {
    output.lines().filter(|line| is_listing_row(line)).collect()
}

/// Parses a listing into `key -> remainder of the row`.
///
/// A row without any tab is a key whose values are all empty strings, which
/// `rabbitmqctl` prints as the bare key (e.g. `/` for a vhost with no
/// permissions). Such rows map to an empty value.
pub fn output_to_map(output: &str) -> BTreeMap<String, String> {
    output_to_map_with(output, str::to_owned)
}

/// Parses a listing, turning the value part of each row with `values_mapper`.
///
/// Rows without a tab map to `V::default()`.
pub fn output_to_map_with<V, F>(output: &str, values_mapper: F) -> BTreeMap<String, V>
where
    V: Default,
    F: Fn(&str) -> V,
{
    let mut ret = BTreeMap::new();

    for row in strip_listing_to_done(output) {
        match row.split_once('\t') {
            Some((key, values)) => {
                ret.insert(key.to_owned(), values_mapper(values));
            }
            None => {
                debug!(key = row, "no values for listing key, using an empty value");
                ret.insert(row.to_owned(), V::default());
            }
        }
    }

    ret
}

/// Splits a tab-separated value list.
pub fn split_values(values: &str) -> Vec<String> {
    values.split('\t').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_tab_maps_to_an_empty_value() {
        let parsed = output_to_map("/");

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["/"], "");
    }

    #[test]
    fn strips_banner_done_and_warning_lines() {
        let output = "Listing permissions for user \"guest\" ...\n\
                      WARNING: management plugin is disabled\n\
                      /\t.*\t.*\t.*\n\
                      staging\n\
                      ...done.";

        let parsed = output_to_map_with(output, split_values);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["/"], vec![".*", ".*", ".*"]);
        assert!(parsed["staging"].is_empty());
    }

    #[test]
    fn only_the_first_tab_separates_key_and_values() {
        let parsed = output_to_map("guest\tconf\twrite\tread");

        assert_eq!(parsed["guest"], "conf\twrite\tread");
    }

    #[test]
    fn listing_banner_without_ellipsis_is_kept() {
        assert_eq!(strip_listing_to_done("Listing\tx"), vec!["Listing\tx"]);
    }
}
