//! Value Codec
//!
//! JSON encoding with an explicit type tag so a reader can tell which shape
//! was stored before decoding it:
//!
//! ```json
//! {"@type":"Record","payload":{"key":"k","value":"v"}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// A value that can be stored with a type tag.
pub trait Tagged: Serialize + DeserializeOwned {
    /// Discriminator written next to the payload.
    const TYPE_TAG: &'static str;
}

impl Tagged for String {
    const TYPE_TAG: &'static str = "String";
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    #[serde(rename = "@type")]
    type_tag: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "@type")]
    type_tag: String,
    payload: serde_json::Value,
}

/// Encodes `value` with its type tag.
pub fn encode<T: Tagged>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        type_tag: T::TYPE_TAG,
        payload: value,
    })?)
}

/// Decodes a tagged value, rejecting payloads tagged as another type.
pub fn decode<T: Tagged>(raw: &str) -> Result<T> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.type_tag != T::TYPE_TAG {
        return Err(CacheError::TypeMismatch {
            expected: T::TYPE_TAG.to_string(),
            found: envelope.type_tag,
        });
    }
    Ok(serde_json::from_value(envelope.payload)?)
}
