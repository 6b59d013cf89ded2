//! Text packets of the socket.io push transport.
//!
//! A websocket frame carries one engine.io packet (`<type><payload>`). An
//! engine `message` packet carries one socket.io packet:
//! `<type>[<attachments>-][<namespace>,][<ack id>][<json>]`.

use log::{ debug, error, warn };
use serde_json::Value as JsonValue;

use crate::error::{ ChatError, Result };
use crate::models::push::{ PushEvent, SisterResponsePayload };

pub const ROOT_NAMESPACE: &str = "/";
pub const SISTER_RESPONSE_EVENT: &str = "sister_response";

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(String),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or_else(|| ChatError::Protocol("empty engine packet".into()))?;
        let rest = chars.as_str().to_string();
        Ok(match kind {
            '0' => EnginePacket::Open(rest),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(rest),
            '3' => EnginePacket::Pong(rest),
            '4' => EnginePacket::Message(rest),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => {
                return Err(ChatError::Protocol(format!("unknown engine packet type '{}'", other)));
            }
        })
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(data) => format!("0{}", data),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0' => SocketPacketKind::Connect,
            '1' => SocketPacketKind::Disconnect,
            '2' => SocketPacketKind::Event,
            '3' => SocketPacketKind::Ack,
            '4' => SocketPacketKind::ConnectError,
            '5' => SocketPacketKind::BinaryEvent,
            '6' => SocketPacketKind::BinaryAck,
            _ => {
                return None;
            }
        })
    }

    fn as_char(self) -> char {
        match self {
            SocketPacketKind::Connect => '0',
            SocketPacketKind::Disconnect => '1',
            SocketPacketKind::Event => '2',
            SocketPacketKind::Ack => '3',
            SocketPacketKind::ConnectError => '4',
            SocketPacketKind::BinaryEvent => '5',
            SocketPacketKind::BinaryAck => '6',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub id: Option<u64>,
    pub data: Option<JsonValue>,
}

impl SocketPacket {
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            id: None,
            data: None,
        }
    }

    pub fn event(namespace: &str, name: &str, payload: JsonValue) -> Self {
        Self {
            kind: SocketPacketKind::Event,
            namespace: namespace.to_string(),
            id: None,
            data: Some(JsonValue::Array(vec![JsonValue::String(name.to_string()), payload])),
        }
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let kind_char = chars
            .next()
            .ok_or_else(|| ChatError::Protocol("empty socket packet".into()))?;
        let kind = SocketPacketKind::from_char(kind_char).ok_or_else(||
            ChatError::Protocol(format!("unknown socket packet type '{}'", kind_char))
        )?;
        let mut rest = chars.as_str();

        if matches!(kind, SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck) {
            let dash = rest
                .find('-')
                .ok_or_else(|| ChatError::Protocol("binary packet without attachment count".into()))?;
            rest = &rest[dash + 1..];
        }

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    let ns = &rest[..comma];
                    rest = &rest[comma + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            ROOT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| ChatError::Protocol(format!("bad ack id: {}", e)))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() { None } else { Some(serde_json::from_str(rest)?) };

        Ok(Self { kind, namespace, id, data })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.namespace != ROOT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Event name and first argument of an event packet.
    pub fn event_parts(&self) -> Option<(&str, Option<&JsonValue>)> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }
        let args = self.data.as_ref()?.as_array()?;
        let name = args.first()?.as_str()?;
        Some((name, args.get(1)))
    }

    /// Maps a packet for `namespace` onto a session-level event.
    pub fn into_push_event(self, namespace: &str) -> Option<PushEvent> {
        if self.namespace != namespace {
            debug!("Ignoring packet for namespace {}", self.namespace);
            return None;
        }
        match self.kind {
            SocketPacketKind::Connect => Some(PushEvent::Connected),
            SocketPacketKind::Disconnect => Some(PushEvent::Disconnected),
            SocketPacketKind::ConnectError => {
                error!("Push namespace {} refused connection: {:?}", namespace, self.data);
                Some(PushEvent::Disconnected)
            }
            SocketPacketKind::Event => {
                let (name, payload) = self.event_parts()?;
                if name != SISTER_RESPONSE_EVENT {
                    debug!("Ignoring push event '{}'", name);
                    return None;
                }
                let payload = payload?.clone();
                match serde_json::from_value::<SisterResponsePayload>(payload) {
                    Ok(p) => Some(PushEvent::SisterResponse { message: p.message }),
                    Err(e) => {
                        warn!("Malformed {} payload: {}", SISTER_RESPONSE_EVENT, e);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}
