//! TCP listener for the uppercase echo service.
//!
//! Binds the configured address, accepts incoming connections, and spawns
//! one task per connection. Connections share no state with each other.

use crate::config::Config;
use crate::protocols::upcase;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Server instance
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let listener = create_listener(addr, config.backlog)?;
        let listener = TcpListener::from_std(listener)?;
        let local_addr = listener.local_addr()?;

        info!(
            address = %local_addr,
            "The socket is bound and the server is listening for connection requests"
        );

        Ok(Server {
            listener,
            local_addr,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever.
    ///
    /// The number of concurrent connections is not capped.
    pub async fn run(self) -> io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "A client has arrived");

                    tokio::spawn(async move {
                        if let Err(e) = upcase::handle_connection(stream, peer).await {
                            debug!(peer = %peer, error = %e, "Connection error");
                        }
                        debug!(peer = %peer, "Connection closed");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

fn create_listener(addr: SocketAddr, backlog: u32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    fn test_config() -> Config {
        Config {
            listen: "127.0.0.1:0".to_string(),
            ..Config::default()
        }
    }

    async fn start_server() -> SocketAddr {
        let server = Server::bind(&test_config()).unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run());
        addr
    }

    async fn read_reply(reader: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_bind_assigns_port() {
        let server = Server::bind(&test_config()).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.local_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let config = Config {
            listen: "not-an-address".to_string(),
            ..Config::default()
        };
        let err = Server::bind(&config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_hello_then_bye() {
        let addr = start_server().await;
        let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());

        client.get_mut().write_all(b"hello\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "HELLO\n");

        client.get_mut().write_all(b"bye\n").await.unwrap();
        let mut rest = Vec::new();
        let n = client.read_to_end(&mut rest).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_bye_any_case() {
        let addr = start_server().await;

        for bye in [&b"BYE\n"[..], b"ByE\n", b"bye\r\n"] {
            let mut client = TcpStream::connect(addr).await.unwrap();
            client.write_all(bye).await.unwrap();

            let mut rest = Vec::new();
            client.read_to_end(&mut rest).await.unwrap();
            assert!(rest.is_empty());
        }
    }

    #[tokio::test]
    async fn test_concurrent_clients_no_cross_talk() {
        let addr = start_server().await;
        let mut a = BufReader::new(TcpStream::connect(addr).await.unwrap());
        let mut b = BufReader::new(TcpStream::connect(addr).await.unwrap());

        a.get_mut().write_all(b"foo\n").await.unwrap();
        b.get_mut().write_all(b"bar\n").await.unwrap();
        a.get_mut().write_all(b"one\n").await.unwrap();
        b.get_mut().write_all(b"two\n").await.unwrap();

        assert_eq!(read_reply(&mut a).await, "FOO\n");
        assert_eq!(read_reply(&mut b).await, "BAR\n");
        assert_eq!(read_reply(&mut a).await, "ONE\n");
        assert_eq!(read_reply(&mut b).await, "TWO\n");
    }

    #[tokio::test]
    async fn test_many_concurrent_clients() {
        let addr = start_server().await;

        let mut handles = Vec::new();
        for i in 0..16 {
            handles.push(tokio::spawn(async move {
                let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
                let msg = format!("client {i}\n");
                client.get_mut().write_all(msg.as_bytes()).await.unwrap();
                assert_eq!(read_reply(&mut client).await, format!("CLIENT {i}\n"));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_partial_line_gets_no_reply() {
        let addr = start_server().await;
        let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());

        client.get_mut().write_all(b"hel").await.unwrap();

        let mut buf = [0u8; 16];
        let pending = tokio::time::timeout(Duration::from_millis(100), client.read(&mut buf)).await;
        assert!(pending.is_err(), "no reply expected before terminator");

        client.get_mut().write_all(b"lo\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "HELLO\n");
    }

    #[tokio::test]
    async fn test_client_disconnect_does_not_stop_server() {
        let addr = start_server().await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"unterminated").await.unwrap();
        drop(first);

        let mut second = BufReader::new(TcpStream::connect(addr).await.unwrap());
        second.get_mut().write_all(b"still here\n").await.unwrap();
        assert_eq!(read_reply(&mut second).await, "STILL HERE\n");
    }
}
