// Common Crate - messages.rs
// wallet-relay/common/src/messages.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes used on the wire. The relay itself only ever emits
/// [`PEER_NOT_CONNECTED`]; the rest belong to the DApp/wallet endpoints but
/// are part of the public protocol.
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;

    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const PEER_NOT_CONNECTED: i64 = -32000;
    pub const SESSION_NOT_FOUND: i64 = -32001;
    pub const SESSION_EXPIRED: i64 = -32002;
    pub const REQUEST_TIMEOUT: i64 = -32003;
}

/// Error payload carried inside a `response` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Frames exchanged over a relay WebSocket.
///
/// Every frame is a JSON object tagged by `type`. The relay originates only
/// `ready`, `error`, `disconnect` and `dapp_reconnected`; everything else is
/// forwarded between the peers verbatim and this enum exists so that
/// endpoints (and tests) share one definition of the shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// Sent by the relay once, right after a peer attaches.
    #[serde(rename = "ready")]
    Ready,

    /// Wallet announces its address and chain to the DApp.
    #[serde(rename = "connect")]
    Connect {
        address: String,
        #[serde(rename = "chainId")]
        chain_id: u64,
    },

    /// Teardown advisory, peer-initiated or relayed on peer close.
    #[serde(rename = "disconnect")]
    Disconnect {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The DApp reattached; the wallet should re-announce its state.
    #[serde(rename = "dapp_reconnected")]
    DappReconnected,

    /// RPC call from the DApp to the wallet.
    #[serde(rename = "request")]
    Request {
        id: u64,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Vec<Value>>,
    },

    /// RPC reply from the wallet; exactly one of `result`/`error` is set.
    #[serde(rename = "response")]
    Response {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<RpcError>,
    },

    /// Chain switch event from the wallet.
    #[serde(rename = "chainChanged")]
    ChainChanged {
        #[serde(rename = "chainId")]
        chain_id: u64,
    },

    /// Account set change from the wallet; empty means disconnected.
    #[serde(rename = "accountsChanged")]
    AccountsChanged { accounts: Vec<String> },

    /// Relay-originated error report.
    #[serde(rename = "error")]
    Error { code: i64, message: String },
}

impl WireMessage {
    /// Reply to a sender whose peer is not currently attached.
    pub fn peer_not_connected() -> Self {
        WireMessage::Error {
            code: codes::PEER_NOT_CONNECTED,
            message: "Peer not connected".to_string(),
        }
    }

    /// Advisory sent to the surviving peer when the other side detaches.
    pub fn peer_disconnected() -> Self {
        WireMessage::Disconnect {
            reason: Some("Peer disconnected".to_string()),
        }
    }

    /// Reply to a binary frame; the protocol is JSON text only.
    pub fn binary_not_supported() -> Self {
        WireMessage::Error {
            code: codes::INVALID_REQUEST,
            message: "Binary frames not supported".to_string(),
        }
    }

    /// Serialize for the wire. These enums cannot fail to serialize; the
    /// fallback keeps the signature infallible.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_shape() {
        assert_eq!(WireMessage::Ready.to_json(), r#"{"type":"ready"}"#);
    }

    #[test]
    fn test_peer_not_connected_shape() {
        let parsed: Value = serde_json::from_str(&WireMessage::peer_not_connected().to_json()).unwrap();
        assert_eq!(
            parsed,
            json!({"type": "error", "code": -32000, "message": "Peer not connected"})
        );
    }

    #[test]
    fn test_disconnect_omits_absent_reason() {
        let msg = WireMessage::Disconnect { reason: None };
        assert_eq!(msg.to_json(), r#"{"type":"disconnect"}"#);
    }

    #[test]
    fn test_connect_roundtrip_uses_camel_case_chain_id() {
        let frame = r#"{"type":"connect","address":"0xabc","chainId":1}"#;
        let msg: WireMessage = serde_json::from_str(frame).unwrap();
        assert_eq!(
            msg,
            WireMessage::Connect {
                address: "0xabc".to_string(),
                chain_id: 1
            }
        );
    }

    #[test]
    fn test_request_shape() {
        let msg = WireMessage::Request {
            id: 1,
            method: "eth_sendTransaction".to_string(),
            params: Some(vec![json!({"to": "0xdef"})]),
        };
        let parsed: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(parsed["type"], "request");
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["method"], "eth_sendTransaction");
    }

    #[test]
    fn test_dapp_reconnected_tag() {
        assert_eq!(
            WireMessage::DappReconnected.to_json(),
            r#"{"type":"dapp_reconnected"}"#
        );
    }
}
