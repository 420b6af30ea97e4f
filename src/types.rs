use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    tungstenite::Message
};
use tokio::net::TcpStream;
use futures::stream::{SplitSink, SplitStream};

/// Plain or TLS websocket to a node.
pub type NodeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half, shared by every session of a node.
pub type WebSocketConnection = SplitSink<NodeStream, Message>;

/// Read half, owned by the node task.
pub type WebSocketReader = SplitStream<NodeStream>;
