//! JSON message format
//!
//! Messages are JSON arrays of strings or numbers, e.g. `["SET","key","v"]`.
//! Replies are objects keyed by the command name: `{"SET":[true,"OK"]}`.

use super::FormatAdapter;
use crate::{Command, Reply};
use bytes::Bytes;
use serde_json::{Map, Value};

/// JSON format adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FormatAdapter for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extract(&self, payload: &[u8]) -> Option<Command> {
        let Value::Array(items) = serde_json::from_slice::<Value>(payload).ok()? else {
            return None;
        };
        if items.is_empty() {
            return None;
        }

        let args = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(Bytes::from(s)),
                Value::Number(n) => Some(Bytes::from(n.to_string())),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Command::new(args))
    }

    fn format_reply(&self, command: &Command, reply: &Reply) -> Bytes {
        let mut body = Map::new();
        body.insert(command.name_lossy(), reply_to_value(reply));
        Bytes::from(Value::Object(body).to_string())
    }
}

fn reply_to_value(reply: &Reply) -> Value {
    match reply {
        Reply::Status(status) => Value::Array(vec![Value::Bool(true), Value::from(status.as_str())]),
        Reply::Error(msg) => Value::Array(vec![Value::Bool(false), Value::from(msg.as_str())]),
        Reply::Integer(n) => Value::from(*n),
        Reply::Bulk(Some(data)) => Value::String(String::from_utf8_lossy(data).into_owned()),
        Reply::Bulk(None) => Value::Null,
        Reply::Array(items) => Value::Array(items.iter().map(reply_to_value).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_strings_and_numbers() {
        let cmd = JsonFormat.extract(br#"["SET","counter",42]"#).unwrap();
        assert_eq!(cmd.args, vec![
            Bytes::from_static(b"SET"),
            Bytes::from_static(b"counter"),
            Bytes::from_static(b"42"),
        ]);
    }

    #[test]
    fn test_extract_rejects_non_commands() {
        assert!(JsonFormat.extract(b"").is_none());
        assert!(JsonFormat.extract(b"not json").is_none());
        assert!(JsonFormat.extract(b"[]").is_none());
        assert!(JsonFormat.extract(br#"{"GET":"k"}"#).is_none());
        assert!(JsonFormat.extract(br#"["GET",null]"#).is_none());
        assert!(JsonFormat.extract(br#"["GET",["nested"]]"#).is_none());
    }

    #[test]
    fn test_format_reply_shapes() {
        let set = Command::new(["SET", "k", "v"]);
        assert_eq!(
            JsonFormat.format_reply(&set, &Reply::ok()),
            Bytes::from_static(br#"{"SET":[true,"OK"]}"#)
        );

        let get = Command::new(["GET", "k"]);
        assert_eq!(
            JsonFormat.format_reply(&get, &Reply::bulk("v")),
            Bytes::from_static(br#"{"GET":"v"}"#)
        );
        assert_eq!(
            JsonFormat.format_reply(&get, &Reply::nil()),
            Bytes::from_static(br#"{"GET":null}"#)
        );

        let incr = Command::new(["INCR", "n"]);
        assert_eq!(
            JsonFormat.format_reply(&incr, &Reply::Integer(7)),
            Bytes::from_static(br#"{"INCR":7}"#)
        );
        assert_eq!(
            JsonFormat.format_reply(&incr, &Reply::error("ERR not an integer")),
            Bytes::from_static(br#"{"INCR":[false,"ERR not an integer"]}"#)
        );

        let multi = Reply::Array(vec![Reply::bulk("a"), Reply::nil(), Reply::Integer(1)]);
        assert_eq!(
            JsonFormat.format_reply(&Command::new(["X"]), &multi),
            Bytes::from_static(br#"{"X":["a",null,1]}"#)
        );
    }
}
