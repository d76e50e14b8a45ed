use std::fmt;

/// Identifies one call, shared between signaling and the media graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u32);

impl SessionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hands out session ids, starting at 1
#[derive(Debug)]
pub struct SessionIdAllocator {
    next: u32,
}

impl Default for SessionIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SessionIdAllocator {
    pub fn reserve(&mut self) -> SessionId {
        let id = SessionId(self.next);
        self.next += 1;
        id
    }

    /// Start over at 1, only valid once no id is in use anymore
    pub fn reset(&mut self) {
        self.next = 1;
    }
}
