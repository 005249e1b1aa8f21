//! Minimal MQTT 3.1.1 broker for tests.
//!
//! Accepts one client, answers CONNECT with CONNACK, PUBLISH (QoS 1) with
//! PUBACK and PINGREQ with PINGRESP, and reports what it received.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerPacket {
    Publish {
        topic: String,
        qos: u8,
        payload: Vec<u8>,
    },
    Disconnect,
}

/// Binds to an ephemeral port and serves a single connection in the background.
pub async fn spawn_broker() -> (u16, mpsc::UnboundedReceiver<BrokerPacket>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let _ = serve(stream, tx).await;
        }
    });

    (port, rx)
}

async fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
    let header = stream.read_u8().await?;

    let mut remaining: usize = 0;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        remaining |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0; remaining];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

async fn serve(
    mut stream: TcpStream,
    tx: mpsc::UnboundedSender<BrokerPacket>,
) -> std::io::Result<()> {
    loop {
        let (header, body) = read_packet(&mut stream).await?;
        match header >> 4 {
            // CONNECT
            1 => stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await?,
            // PUBLISH
            3 => {
                let qos = (header >> 1) & 0x03;
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).to_string();
                let mut offset = 2 + topic_len;
                if qos > 0 {
                    let (hi, lo) = (body[offset], body[offset + 1]);
                    offset += 2;
                    stream.write_all(&[0x40, 0x02, hi, lo]).await?;
                }
                let _ = tx.send(BrokerPacket::Publish {
                    topic,
                    qos,
                    payload: body[offset..].to_vec(),
                });
            }
            // PINGREQ
            12 => stream.write_all(&[0xd0, 0x00]).await?,
            // DISCONNECT
            14 => {
                let _ = tx.send(BrokerPacket::Disconnect);
                return Ok(());
            }
            _ => {}
        }
    }
}
