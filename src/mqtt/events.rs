use rumqttc::ConnectReturnCode;

/// Asynchronous outcomes reported by the connection's background I/O task.
///
/// Delivered on an unbounded channel so the publish loop may drain them for
/// logging without ever blocking the event loop; leaving them unread is
/// equally fine.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// CONNACK with a success code.
    Connected { session_present: bool },
    /// CONNACK carrying a non-success reason code, e.g. bad credentials.
    /// Not fatal: the run keeps going while the event loop retries (see
    /// the connect-failure note in DESIGN.md).
    ConnectFailed { code: ConnectReturnCode },
    /// Broker acknowledged a QoS 1 publish.
    PubAck { pkid: u16 },
    /// Broker closed the session.
    Disconnected,
    /// Transport-level failure after the initial connect; the event loop
    /// retries on its own.
    TransportError { message: String },
}
