//! UdpTransport - JSON datagrams to a pub/sub relay
//!
//! Each datagram is `{"topic":..,"retain":..,"payload":..}` with the payload
//! embedded verbatim. The relay owns retention and broker delivery.
//!
//! The last will goes out from `Drop` through a std clone of the socket: a
//! direct syscall needs no reactor readiness, so a fresh or idle socket
//! still delivers it.

use std::net::UdpSocket as StdUdpSocket;

use contracts::{ContractError, OutboundMessage, PubSubTransport};
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Largest payload that fits one IPv4 UDP datagram
const MAX_DATAGRAM: usize = 65_507;

/// Wrap a message into the relay envelope
pub fn envelope(message: &OutboundMessage) -> Vec<u8> {
    // A str always serializes
    let topic = serde_json::to_string(message.topic.as_str()).unwrap_or_else(|_| "\"\"".into());
    let mut out = Vec::with_capacity(message.payload.len() + topic.len() + 40);
    out.extend_from_slice(b"{\"topic\":");
    out.extend_from_slice(topic.as_bytes());
    let retain: &[u8] = if message.retain {
        b",\"retain\":true,\"payload\":"
    } else {
        b",\"retain\":false,\"payload\":"
    };
    out.extend_from_slice(retain);
    out.extend_from_slice(&message.payload);
    out.push(b'}');
    out
}

/// Transport that sends each message as one datagram
pub struct UdpTransport {
    name: String,
    target: String,
    socket: Option<UdpSocket>,
    /// Same socket, used only for the last will
    will_socket: Option<StdUdpSocket>,
    last_will: Option<OutboundMessage>,
}

impl UdpTransport {
    /// Bind an ephemeral port and connect to the relay at `addr`
    #[instrument(name = "udp_transport_connect", skip(name))]
    pub async fn connect(name: impl Into<String>, addr: &str) -> Result<Self, ContractError> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .connect(addr)
            .await
            .map_err(|e| ContractError::publish(&name, format!("cannot reach '{addr}': {e}")))?;

        let std_socket = socket.into_std()?;
        let will_socket = std_socket.try_clone()?;
        let socket = UdpSocket::from_std(std_socket)?;

        debug!(transport = %name, target = %addr, "UdpTransport connected");

        Ok(Self {
            name,
            target: addr.to_string(),
            socket: Some(socket),
            will_socket: Some(will_socket),
            last_will: None,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::publish(&self.name, "socket closed"))
    }
}

impl PubSubTransport for UdpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_last_will(&mut self, message: OutboundMessage) {
        self.last_will = Some(message);
    }

    #[instrument(
        name = "udp_transport_publish",
        skip(self, message),
        fields(transport = %self.name, topic = %message.topic)
    )]
    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        let data = envelope(message);
        if data.len() > MAX_DATAGRAM {
            warn!(transport = %self.name, size = data.len(), "Datagram too large, dropped");
            return Err(ContractError::publish(&self.name, "datagram too large"));
        }

        let sent = self
            .socket()?
            .send(&data)
            .await
            .map_err(|e| ContractError::publish(&self.name, e.to_string()))?;
        debug!(transport = %self.name, bytes = sent, "Sent");
        Ok(())
    }

    #[instrument(name = "udp_transport_close", skip(self), fields(transport = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        // Clean disconnect: the will is withdrawn
        self.last_will = None;
        self.will_socket = None;
        self.socket = None;
        debug!(transport = %self.name, "UdpTransport closed");
        Ok(())
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        let (Some(socket), Some(will)) = (self.will_socket.as_ref(), self.last_will.take()) else {
            return;
        };
        match socket.send(&envelope(&will)) {
            Ok(_) => warn!(transport = %self.name, "Unclean disconnect, last will sent"),
            Err(e) => error!(transport = %self.name, error = %e, "Last will send failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Topic;
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn test_envelope_embeds_payload() {
        let message =
            OutboundMessage::new(Topic::new("switchgear/accel"), r#"{"x":1,"y":2,"z":3}"#)
                .retained();
        let value: Value = serde_json::from_slice(&envelope(&message)).unwrap();
        assert_eq!(value["topic"], "switchgear/accel");
        assert_eq!(value["retain"], true);
        assert_eq!(value["payload"]["z"], 3);
    }

    #[tokio::test]
    async fn test_udp_round_trip() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();

        let mut transport = UdpTransport::connect("udp", &addr).await.unwrap();
        let message = OutboundMessage::new(Topic::new("switchgear/status"), r#"{"status":"online"}"#);
        transport.publish(&message).await.unwrap();

        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(value["payload"]["status"], "online");
        assert_eq!(value["retain"], false);

        transport.close().await.unwrap();
        assert!(transport.publish(&message).await.is_err());
    }

    #[tokio::test]
    async fn test_will_sent_on_unclean_drop() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();

        let mut transport = UdpTransport::connect("udp", &addr).await.unwrap();
        transport.set_last_will(
            OutboundMessage::new(Topic::new("switchgear/status"), r#"{"status":"offline"}"#)
                .retained(),
        );
        drop(transport);

        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .expect("last will not delivered")
            .unwrap();
        let value: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(value["payload"]["status"], "offline");
        assert_eq!(value["retain"], true);
    }

    #[tokio::test]
    async fn test_clean_close_withdraws_will() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();

        let mut transport = UdpTransport::connect("udp", &addr).await.unwrap();
        transport.set_last_will(
            OutboundMessage::new(Topic::new("switchgear/status"), r#"{"status":"offline"}"#)
                .retained(),
        );
        transport.close().await.unwrap();
        drop(transport);

        let mut buf = [0u8; 1024];
        let received =
            tokio::time::timeout(Duration::from_millis(200), receiver.recv(&mut buf)).await;
        assert!(received.is_err());
    }
}
