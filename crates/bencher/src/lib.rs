use std::io;

use micro_client::connection::ClientConnection;

/// A raw response captured from the wire, used as benchmark input
#[derive(Debug, Copy, Clone)]
pub struct ResponseFixture {
    name: &'static str,
    size: FixtureSize,
    content: &'static str,
}

impl ResponseFixture {
    pub const fn new(name: &'static str, size: FixtureSize, content: &'static str) -> Self {
        Self { name, size, content }
    }

    pub const fn small(name: &'static str, content: &'static str) -> Self {
        Self::new(name, FixtureSize::Small, content)
    }

    pub const fn large(name: &'static str, content: &'static str) -> Self {
        Self::new(name, FixtureSize::Large, content)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> FixtureSize {
        self.size
    }

    pub fn content(&self) -> &'static str {
        self.content
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixtureSize {
    Small,
    Large,
}

/// Connection stand-in for benchmarks, it is always open and ignores interest changes
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleConnection;

impl ClientConnection for IdleConnection {
    fn is_open(&self) -> bool {
        true
    }

    fn request_input(&self) {}

    fn suspend_input(&self) {}

    fn request_output(&self) {}

    fn suspend_output(&self) {}

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        Ok(())
    }
}
