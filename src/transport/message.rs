//! Wire messages
//!
//! Inbound frames are JSON text. Decoding happens in two steps: the
//! envelope's `action` tag first, then the body for that tag.
//!
//! - `{"action":"subscribe","topics":["a","b"]}` replaces the client's
//!   subscriptions with `a` and `b`.
//! - Anything else, including a missing or unknown `action`, is a publish
//!   and must carry a `topic`. The whole frame is forwarded verbatim.
//!
//! A frame that is not a JSON object is rejected before its tag is read.

use serde::Deserialize;
use serde_json::Value;

use crate::utils::error::DecodeError;

/// The tag every inbound frame must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Subscribe,
    Publish,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeBody {
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PublishBody {
    topic: String,
}

impl Action {
    pub const SUBSCRIBE: &'static str = "subscribe";

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope =
            serde_json::from_value(object(text)?).map_err(DecodeError::Envelope)?;
        Ok(match envelope.action.as_deref() {
            Some(Self::SUBSCRIBE) => Self::Subscribe,
            _ => Self::Publish,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Subscribe { topics: Vec<String> },
    Publish { topic: String, payload: String },
}

impl ClientMessage {
    /// Decodes the body of a frame whose tag is already known.
    pub fn decode(action: Action, text: &str) -> Result<Self, DecodeError> {
        match action {
            Action::Subscribe => {
                let body: SubscribeBody =
                    serde_json::from_value(object(text)?).map_err(DecodeError::Subscribe)?;
                Ok(Self::Subscribe {
                    topics: body.topics,
                })
            }
            Action::Publish => {
                let body: PublishBody =
                    serde_json::from_value(object(text)?).map_err(DecodeError::Publish)?;
                Ok(Self::Publish {
                    topic: body.topic,
                    payload: text.to_string(),
                })
            }
        }
    }
}

/// Parses `text` and insists on a JSON object. Derived struct decoding would
/// otherwise accept an array as a sequence of fields.
fn object(text: &str) -> Result<Value, DecodeError> {
    match serde_json::from_str(text).map_err(DecodeError::Envelope)? {
        value @ Value::Object(_) => Ok(value),
        _ => Err(DecodeError::NotAnObject),
    }
}
