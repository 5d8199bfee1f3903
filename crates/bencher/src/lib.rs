//! Shared fixtures for the benchmarks.

/// A captured HTTP request preamble used as benchmark input.
#[derive(Debug, Copy, Clone)]
pub struct Fixture {
    name: &'static str,
    content: &'static str,
}

impl Fixture {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    /// The fixture with its line endings normalized to CRLF, as sent on the wire.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.content.len() + 64);
        for line in self.content.lines() {
            bytes.extend_from_slice(line.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }
        bytes
    }
}

pub static SMALL_REQUEST: Fixture = Fixture::new("get_small", include_str!("../resources/request/get_small.txt"));
pub static LARGE_REQUEST: Fixture = Fixture::new("get_large", include_str!("../resources/request/get_large.txt"));

pub fn request_fixtures() -> [Fixture; 2] {
    [SMALL_REQUEST, LARGE_REQUEST]
}
