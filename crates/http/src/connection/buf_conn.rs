use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

/// Default capacity of both the read and the write buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

pub type ConnReader = BufReader<OwnedReadHalf>;
pub type ConnWriter = BufWriter<OwnedWriteHalf>;

/// Socket level options a connection needs before it is wrapped.
pub trait Socket {
    /// Enables TCP keep-alive probing, starting after `period` of idleness.
    fn set_keepalive(&self, period: Duration) -> io::Result<()>;
}

impl Socket for TcpStream {
    fn set_keepalive(&self, period: Duration) -> io::Result<()> {
        let keepalive = TcpKeepalive::new().with_time(period);
        SockRef::from(self).set_tcp_keepalive(&keepalive)
    }
}

/// A TCP connection with a buffered reader and a buffered writer.
///
/// The two halves can be borrowed at the same time through [`BufConn::split`], so
/// one task can read a message while writing another. There is no locking: the
/// owner of the `BufConn` drives both directions.
///
/// After [`BufConn::close`] every accessor returns [`io::ErrorKind::NotConnected`].
#[derive(Debug)]
pub struct BufConn {
    io: Option<(ConnReader, ConnWriter)>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl BufConn {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        Self::with_capacity(stream, DEFAULT_BUFFER_SIZE, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(stream: TcpStream, read_capacity: usize, write_capacity: usize) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            io: Some((BufReader::with_capacity(read_capacity, reader), BufWriter::with_capacity(write_capacity, writer))),
            peer_addr,
            local_addr,
        })
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn reader(&mut self) -> io::Result<&mut ConnReader> {
        self.split().map(|(reader, _)| reader)
    }

    pub fn writer(&mut self) -> io::Result<&mut ConnWriter> {
        self.split().map(|(_, writer)| writer)
    }

    /// Borrows the reader and the writer together.
    pub fn split(&mut self) -> io::Result<(&mut ConnReader, &mut ConnWriter)> {
        match &mut self.io {
            Some((reader, writer)) => Ok((reader, writer)),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush().await
    }

    /// Number of bytes read from the socket but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.io.as_ref().map_or(0, |(reader, _)| reader.buffer().len())
    }

    pub fn set_keepalive(&self, period: Duration) -> io::Result<()> {
        match &self.io {
            Some((reader, _)) => {
                let stream: &TcpStream = reader.get_ref().as_ref();
                stream.set_keepalive(period)
            }
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    /// Returns true while the peer has neither sent anything unread nor closed its side.
    ///
    /// Peeks at the socket itself; nothing is consumed.
    pub fn is_idle(&self) -> bool {
        let Some((reader, _)) = &self.io else {
            return false;
        };
        if !reader.buffer().is_empty() {
            return false;
        }

        let stream: &TcpStream = reader.get_ref().as_ref();
        let mut byte = [MaybeUninit::<u8>::uninit()];
        match SockRef::from(stream).peek(&mut byte) {
            Err(e) => e.kind() == io::ErrorKind::WouldBlock,
            Ok(_) => false,
        }
    }

    /// Drops the socket. Unflushed writes are discarded. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some((reader, writer)) = self.io.take() {
            trace!(peer = %self.peer_addr, unread = reader.buffer().len(), unflushed = writer.buffer().len(), "closing connection");
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.io.is_none()
    }
}
