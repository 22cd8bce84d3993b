//! Decode command - print the contents of a frame file.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::{Map, Value, json};

use geode_session::{
    AttributeDelta, AttributeValue, DataInput, SerializerRegistry, SessionDelta, SessionState,
};

use super::Context;

/// Arguments for the decode command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding a frame (4-byte type id followed by the payload)
    pub file: PathBuf,

    /// Treat the frame as a delta instead of a full snapshot
    #[arg(long)]
    pub delta: bool,
}

/// What a frame decoded to.
enum Decoded {
    Session(SessionState),
    SessionDelta(SessionDelta),
    Attributes(Vec<(String, AttributeValue)>),
    AttributesDelta(AttributeDelta),
}

/// Run the decode command.
pub async fn run(args: DecodeArgs, ctx: &Context) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("reading frame from {}", args.file.display()))?;
    let registry = SerializerRegistry::with_defaults();
    let (type_id, decoded) = decode(&registry, &bytes, args.delta)
        .with_context(|| format!("decoding {}", args.file.display()))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&to_json(type_id, &decoded))?);
    } else {
        print_human(type_id, &decoded, bytes.len());
    }
    Ok(())
}

fn decode(registry: &SerializerRegistry, bytes: &[u8], delta: bool) -> geode_session::Result<(u32, Decoded)> {
    let type_id = DataInput::new(bytes).read_u32()?;

    if registry.session(type_id).is_ok() {
        let decoded = if delta {
            Decoded::SessionDelta(registry.decode_session_delta(bytes)?)
        } else {
            Decoded::Session(registry.decode_session(bytes)?)
        };
        return Ok((type_id, decoded));
    }

    let serializer = registry.attributes(type_id)?;
    let mut input = DataInput::new(bytes);
    input.read_u32()?;
    let decoded = if delta {
        Decoded::AttributesDelta(serializer.read_delta(&mut input)?)
    } else {
        Decoded::Attributes(serializer.read_full(&mut input)?)
    };
    input.finish()?;
    Ok((type_id, decoded))
}

fn attributes_json(attributes: &[(String, AttributeValue)]) -> Value {
    let mut map = Map::new();
    for (name, value) in attributes {
        map.insert(name.clone(), json!(value));
    }
    Value::Object(map)
}

fn delta_json(delta: &AttributeDelta) -> Value {
    json!({
        "updated": attributes_json(&delta.updated),
        "removed": delta.removed,
    })
}

fn to_json(type_id: u32, decoded: &Decoded) -> Value {
    let type_id = format!("{type_id:#010X}");
    match decoded {
        Decoded::Session(state) => json!({
            "type_id": type_id,
            "kind": "session",
            "id": state.id,
            "creation_time": state.creation_time.to_rfc3339(),
            "last_accessed_time": state.last_accessed_time.to_rfc3339(),
            "max_inactive_interval_secs": state.max_inactive_interval_secs,
            "attributes": attributes_json(&state.attributes),
        }),
        Decoded::SessionDelta(delta) => json!({
            "type_id": type_id,
            "kind": "session-delta",
            "id": delta.id,
            "last_accessed_time": delta.last_accessed_time.to_rfc3339(),
            "max_inactive_interval_secs": delta.max_inactive_interval_secs,
            "attributes": delta_json(&delta.attributes),
        }),
        Decoded::Attributes(attributes) => json!({
            "type_id": type_id,
            "kind": "attributes",
            "attributes": attributes_json(attributes),
        }),
        Decoded::AttributesDelta(delta) => json!({
            "type_id": type_id,
            "kind": "attributes-delta",
            "attributes": delta_json(delta),
        }),
    }
}

fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Null => "null".to_string(),
        AttributeValue::Bool(v) => v.to_string(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Long(v) => format!("{v}L"),
        AttributeValue::Double(v) => format!("{v:?}"),
        AttributeValue::String(v) => format!("{v:?}"),
        AttributeValue::Opaque(bytes) => format!("<{} opaque bytes>", bytes.len()),
    }
}

fn print_attributes(attributes: &[(String, AttributeValue)]) {
    if attributes.is_empty() {
        println!("  (none)");
    }
    for (name, value) in attributes {
        println!("  {:<24} {:<7} {}", name, value.type_name(), format_value(value));
    }
}

fn print_delta(delta: &AttributeDelta) {
    println!("Updated:");
    print_attributes(&delta.updated);
    println!("Removed:");
    if delta.removed.is_empty() {
        println!("  (none)");
    }
    for name in &delta.removed {
        println!("  {name}");
    }
}

fn print_human(type_id: u32, decoded: &Decoded, len: usize) {
    println!("Frame: {len} bytes, type id {type_id:#010X}\n");
    match decoded {
        Decoded::Session(state) => {
            println!("Session:        {}", state.id);
            println!("Created:        {}", state.creation_time.to_rfc3339());
            println!("Last accessed:  {}", state.last_accessed_time.to_rfc3339());
            println!("Max inactive:   {}s\n", state.max_inactive_interval_secs);
            println!("Attributes:");
            print_attributes(&state.attributes);
        }
        Decoded::SessionDelta(delta) => {
            println!("Session delta:  {}", delta.id);
            println!("Last accessed:  {}", delta.last_accessed_time.to_rfc3339());
            println!("Max inactive:   {}s\n", delta.max_inactive_interval_secs);
            print_delta(&delta.attributes);
        }
        Decoded::Attributes(attributes) => {
            println!("Attributes:");
            print_attributes(attributes);
        }
        Decoded::AttributesDelta(delta) => print_delta(delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geode_session::{AttributeStore, DATA_ATTRIBUTES_SERIALIZER_ID, DATA_SESSION_SERIALIZER_ID, EncodeMode, Session};

    #[test]
    fn test_decode_session_frame() {
        let registry = SerializerRegistry::with_defaults();
        let session = Session::with_id("s-1", 60);
        session.set_attribute("a", 1);
        let frame = registry
            .encode_session(DATA_SESSION_SERIALIZER_ID, &session.to_state())
            .unwrap();

        let (type_id, decoded) = decode(&registry, &frame, false).unwrap();
        assert_eq!(type_id, DATA_SESSION_SERIALIZER_ID);
        let value = to_json(type_id, &decoded);
        assert_eq!(value["kind"], "session");
        assert_eq!(value["id"], "s-1");
        assert_eq!(value["attributes"]["a"]["value"], 1);
    }

    #[test]
    fn test_decode_attributes_delta_frame() {
        let registry = SerializerRegistry::with_defaults();
        let store = AttributeStore::from_entries([("gone", AttributeValue::from(true))]);
        store.set_attribute("x", "y");
        store.remove_attribute("gone");
        let frame = registry
            .encode_attributes(DATA_ATTRIBUTES_SERIALIZER_ID, &store, EncodeMode::Delta)
            .unwrap();

        let (_, decoded) = decode(&registry, &frame, true).unwrap();
        let value = to_json(DATA_ATTRIBUTES_SERIALIZER_ID, &decoded);
        assert_eq!(value["kind"], "attributes-delta");
        assert_eq!(value["attributes"]["removed"][0], "gone");
    }

    #[test]
    fn test_decode_unknown_type() {
        let registry = SerializerRegistry::with_defaults();
        let err = decode(&registry, &[0, 0, 0, 1], false).err().unwrap();
        assert!(matches!(err, geode_session::Error::UnknownType(1)));
    }
}
