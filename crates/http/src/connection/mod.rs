//! Buffered TCP connections
//!
//! A proxy holds two sockets per exchange, one to the client and one to the
//! backend, and reads from one while writing to the other. [`BufConn`] pairs a
//! buffered reader with a buffered writer over the split halves of one
//! `TcpStream`, so both directions can be driven at the same time.
//!
//! # Features
//!
//! - Disjoint borrows of the read and write halves
//! - Count of bytes read but not yet consumed, to detect pipelined or stray input
//! - Idempotent close
//! - TCP keep-alive probing through the [`Socket`] trait

mod buf_conn;

pub use buf_conn::{BufConn, ConnReader, ConnWriter, DEFAULT_BUFFER_SIZE, Socket};
