use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Result, VortexError};

/// One line on the wire: `{"src": .., "dest": .., "body": {..}}`.
///
/// The body stays an opaque JSON document; only the dispatch loop and the
/// handlers look inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    src: String,
    #[serde(default)]
    dest: String,
    body: Box<RawValue>,
}

/// Header fields shared by every body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageBody {
    pub fn of_type(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitBody {
    pub node_id: String,
    #[serde(default)]
    pub node_ids: Vec<String>,
}

impl Envelope {
    pub fn new<B: Serialize + ?Sized>(src: &str, dest: &str, body: &B) -> Result<Self> {
        let body = serde_json::value::to_raw_value(body)
            .map_err(|e| VortexError::Serialization(e.to_string()))?;
        Ok(Self::from_raw(src, dest, body))
    }

    pub fn from_raw(src: &str, dest: &str, body: Box<RawValue>) -> Self {
        Self {
            src: src.to_string(),
            dest: dest.to_string(),
            body,
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn body(&self) -> &RawValue {
        &self.body
    }

    pub fn header(&self) -> Result<MessageBody> {
        self.decode_body()
    }

    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.body.get()).map_err(|e| VortexError::MalformedBody(e.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let buf =
            serde_json::to_vec(self).map_err(|e| VortexError::Serialization(e.to_string()))?;
        if buf.contains(&b'\n') {
            return Err(VortexError::Serialization(
                "encoded envelope contains a newline".to_string(),
            ));
        }
        Ok(buf)
    }

    pub fn decode(line: &[u8]) -> Result<Self> {
        serde_json::from_slice(line).map_err(|e| VortexError::MalformedEnvelope(e.to_string()))
    }
}
