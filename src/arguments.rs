// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Declaration Arguments
//!
//! Optional `x-` arguments attached to exchanges, queues and bindings. Topology
//! documents may write them either as one mapping or as a list of single-key
//! mappings; both end up as a single `Arguments` map that is JSON-encoded into
//! the `arguments=<json>` parameter of `rabbitmqadmin declare`.

use crate::errors::AdminError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Argument map sent to the broker with a declaration.
pub type Arguments = BTreeMap<String, Value>;

#[derive(Deserialize)]
#[serde(untagged)]
enum ArgumentsRepr {
    Sequence(Vec<BTreeMap<String, Value>>),
    Mapping(BTreeMap<String, Value>),
}

/// Merges a sequence of mappings into one, in order. Later keys win.
pub fn flatten_arguments<I>(items: I) -> Arguments
where
    I: IntoIterator<Item = BTreeMap<String, Value>>,
{
    let mut args = Arguments::new();
    for item in items {
        args.extend(item);
    }
    args
}

/// Serde helper accepting both the sequence and the mapping form.
pub fn deserialize_arguments<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ArgumentsRepr::deserialize(deserializer)? {
        ArgumentsRepr::Sequence(items) => flatten_arguments(items),
        ArgumentsRepr::Mapping(map) => map,
    })
}

pub(crate) fn encode_arguments(args: &Arguments) -> Result<String, AdminError> {
    serde_json::to_string(args).map_err(|err| AdminError::EncodeArgumentsError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_arguments")]
        arguments: Arguments,
    }

    #[test]
    fn flatten_keeps_the_last_value_for_repeated_keys() {
        let items = vec![
            BTreeMap::from([("x-message-ttl".to_owned(), json!(1000))]),
            BTreeMap::from([("x-expires".to_owned(), json!(5000))]),
            BTreeMap::from([("x-message-ttl".to_owned(), json!(2000))]),
        ];

        let args = flatten_arguments(items);

        assert_eq!(args.len(), 2);
        assert_eq!(args["x-message-ttl"], json!(2000));
        assert_eq!(args["x-expires"], json!(5000));
    }

    #[test]
    fn accepts_a_list_of_single_key_mappings() {
        let holder: Holder = serde_json::from_value(json!({
            "arguments": [
                {"x-message-ttl": 86400000},
                {"x-dead-letter-exchange": "deadletters.fanout"}
            ]
        }))
        .unwrap();

        assert_eq!(holder.arguments["x-message-ttl"], json!(86400000));
        assert_eq!(
            holder.arguments["x-dead-letter-exchange"],
            json!("deadletters.fanout")
        );
    }

    #[test]
    fn accepts_a_plain_mapping_and_a_missing_field() {
        let holder: Holder =
            serde_json::from_value(json!({"arguments": {"x-max-priority": 10}})).unwrap();
        assert_eq!(holder.arguments["x-max-priority"], json!(10));

        let empty: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(empty.arguments.is_empty());
    }

    #[test]
    fn encodes_empty_arguments_as_an_empty_object() {
        assert_eq!(encode_arguments(&Arguments::new()).unwrap(), "{}");
    }
}
