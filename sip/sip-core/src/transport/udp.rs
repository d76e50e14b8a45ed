use sip_types::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::{fmt, io};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const MAX_MSG_SIZE: usize = u16::MAX as usize;

/// Message received from the network
#[derive(Debug)]
pub struct ReceivedMessage {
    pub message: Message,
    pub source: SocketAddr,
}

#[derive(Debug)]
struct Inner {
    bound: SocketAddr,
    socket: UdpSocket,
}

/// UDP transport, parsed datagrams are forwarded to the event loop
#[derive(Debug)]
pub struct Udp {
    inner: Arc<Inner>,
    receive_task: JoinHandle<()>,
}

impl fmt::Display for Udp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "udp:bound={}", self.inner.bound)
    }
}

impl Udp {
    pub const NAME: &'static str = "UDP";

    pub async fn bind<A>(addr: A, inbound: mpsc::UnboundedSender<ReceivedMessage>) -> io::Result<Self>
    where
        A: ToSocketAddrs,
    {
        let socket = UdpSocket::bind(addr).await?;
        let bound = socket.local_addr()?;

        log::info!("Bound UDP to {bound}");

        let inner = Arc::new(Inner { bound, socket });

        let receive_task = tokio::spawn(receive_task(inbound, inner.clone()));

        Ok(Self {
            inner,
            receive_task,
        })
    }

    pub fn bound(&self) -> SocketAddr {
        self.inner.bound
    }

    pub async fn send(&self, bytes: &[u8], target: SocketAddr) -> io::Result<()> {
        self.inner.socket.send_to(bytes, target).await.map(|_| ())
    }
}

impl Drop for Udp {
    fn drop(&mut self) {
        self.receive_task.abort();
    }
}

async fn receive_task(inbound: mpsc::UnboundedSender<ReceivedMessage>, inner: Arc<Inner>) {
    let mut buffer = vec![0u8; MAX_MSG_SIZE];

    loop {
        let (len, source) = match inner.socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                log::error!("UDP recv error {e:?}");
                continue;
            }
        };

        let Some(message) = handle_datagram(&inner, &buffer[..len], source).await else {
            continue;
        };

        if inbound.send(ReceivedMessage { message, source }).is_err() {
            log::debug!("event loop is gone, stopping UDP receive task");
            return;
        }
    }
}

async fn handle_datagram(inner: &Inner, bytes: &[u8], source: SocketAddr) -> Option<Message> {
    match bytes {
        // RFC 5626 keep-alive ping, answered with a pong
        b"\r\n\r\n" => {
            if let Err(e) = inner.socket.send_to(b"\r\n", source).await {
                log::error!("failed to answer keep-alive from {source}, {e}");
            }

            None
        }
        b"\r\n" => None,
        bytes => match Message::parse(bytes) {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("dropping malformed message from {source}, {e}");
                None
            }
        },
    }
}
