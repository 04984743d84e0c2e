//! Engine.IO v4 and Socket.IO v5 text packet codec.
//!
//! Engine.IO frames each WebSocket text message with a one-digit packet
//! type. Message packets (`4`) carry a Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! ```
//!
//! Binary attachments are not supported; the game contract is JSON only.

use crate::error::SyncError;
use derive_getters::Getters;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

/// Engine.IO protocol revision spoken by this client.
pub const EIO_VERSION: u8 = 4;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Open-handshake data sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    sid: String,
    /// Transport upgrades on offer.
    #[serde(default)]
    upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    #[serde(default)]
    ping_interval: u64,
    /// Server ping timeout in milliseconds.
    #[serde(default)]
    ping_timeout: u64,
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`: session opened.
    Open(Handshake),
    /// `1`: session closed.
    Close,
    /// `2`: heartbeat from the server.
    Ping(String),
    /// `3`: heartbeat reply.
    Pong(String),
    /// `4`: application message (a Socket.IO packet).
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Decodes a WebSocket text frame.
    #[instrument]
    pub fn decode(text: &str) -> Result<Self, SyncError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SyncError::protocol("empty Engine.IO packet"))?;
        let rest = chars.as_str();
        match kind {
            '0' => {
                let handshake: Handshake = serde_json::from_str(rest)
                    .map_err(|e| SyncError::protocol(format!("bad open handshake: {}", e)))?;
                Ok(EnginePacket::Open(handshake))
            }
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => Ok(EnginePacket::Message(rest.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(SyncError::protocol(format!(
                "unknown Engine.IO packet type {:?}",
                other
            ))),
        }
    }

    /// Encodes the packet as a WebSocket text frame.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => format!("0{{\"sid\":\"{}\"}}", handshake.sid),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect (client request or server acknowledgement).
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth (outbound) or `{sid}` (inbound).
        data: Option<Value>,
    },
    /// `1`: namespace disconnect.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// `2`: named event.
    Event {
        /// Namespace.
        namespace: String,
        /// Acknowledgement id, when the sender wants one.
        ack: Option<u64>,
        /// Event name.
        name: String,
        /// Arguments after the name.
        args: Vec<Value>,
    },
    /// `3`: acknowledgement.
    Ack {
        /// Namespace.
        namespace: String,
        /// Id being acknowledged.
        ack: u64,
        /// Reply arguments.
        args: Vec<Value>,
    },
    /// `4`: namespace connect refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Error data, usually `{message}`.
        data: Value,
    },
}

impl SocketPacket {
    /// Namespace connect request.
    pub fn connect(namespace: &str) -> Self {
        SocketPacket::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    /// Event with an optional single payload argument.
    pub fn event(namespace: &str, name: &str, payload: Option<Value>) -> Self {
        SocketPacket::Event {
            namespace: namespace.to_string(),
            ack: None,
            name: name.to_string(),
            args: payload.into_iter().collect(),
        }
    }

    /// Namespace the packet belongs to.
    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decodes the body of an Engine.IO message packet.
    #[instrument]
    pub fn decode(text: &str) -> Result<Self, SyncError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SyncError::protocol("empty Socket.IO packet"))?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(SyncError::protocol("binary Socket.IO packets are not supported"));
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let ack = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| SyncError::protocol(format!("bad ack id: {}", e)))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| SyncError::protocol(format!("bad packet data: {}", e)))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(args)) => args,
                    _ => return Err(SyncError::protocol("event data must be an array")),
                };
                if args.is_empty() {
                    return Err(SyncError::protocol("event without a name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    _ => return Err(SyncError::protocol("event name must be a string")),
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack,
                    name,
                    args,
                })
            }
            '3' => {
                let ack = ack.ok_or_else(|| SyncError::protocol("ack without id"))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => Vec::new(),
                    _ => return Err(SyncError::protocol("ack data must be an array")),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack,
                    args,
                })
            }
            '4' => Ok(SocketPacket::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            }),
            other => Err(SyncError::protocol(format!(
                "unknown Socket.IO packet type {:?}",
                other
            ))),
        }
    }

    /// Encodes the packet as the body of an Engine.IO message packet.
    pub fn encode(&self) -> String {
        let (kind, namespace) = match self {
            SocketPacket::Connect { namespace, .. } => ('0', namespace),
            SocketPacket::Disconnect { namespace } => ('1', namespace),
            SocketPacket::Event { namespace, .. } => ('2', namespace),
            SocketPacket::Ack { namespace, .. } => ('3', namespace),
            SocketPacket::ConnectError { namespace, .. } => ('4', namespace),
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            SocketPacket::Connect { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            SocketPacket::Disconnect { .. } => {}
            SocketPacket::Event {
                ack, name, args, ..
            } => {
                if let Some(ack) = ack {
                    out.push_str(&ack.to_string());
                }
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                out.push_str(&Value::Array(array).to_string());
            }
            SocketPacket::Ack { ack, args, .. } => {
                out.push_str(&ack.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            SocketPacket::ConnectError { data, .. } => out.push_str(&data.to_string()),
        }
        out
    }

    /// Wraps the packet in an Engine.IO message frame.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

/// Builds the WebSocket URL for a Socket.IO server.
///
/// `http`/`https` schemes become `ws`/`wss`; the Engine.IO query string is
/// appended to `path`.
#[instrument]
pub fn websocket_url(base: &str, path: &str) -> Result<String, SyncError> {
    let base = base.trim().trim_end_matches('/');
    let (scheme, host) = base
        .split_once("://")
        .ok_or_else(|| SyncError::config(format!("server URL {:?} has no scheme", base)))?;
    let scheme = match scheme {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SyncError::config(format!(
                "unsupported URL scheme {:?}",
                other
            )));
        }
    };
    if host.is_empty() {
        return Err(SyncError::config("server URL has no host"));
    }
    let path = format!("/{}/", path.trim_matches('/'));
    Ok(format!(
        "{}://{}{}?EIO={}&transport=websocket",
        scheme, host, path, EIO_VERSION
    ))
}
