use std::time::Instant;

/// Kind of media carried by a [`MediaUnit`] and accepted/produced by filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No media, used as input type of sources and output type of sinks
    None,
    /// Interleaved RGBX, 4 bytes per pixel
    Rgb32Video,
    /// Planar I420
    Yuv420Video,
    /// Interleaved 16 bit PCM
    RawAudio,
    EncodedVideo,
    EncodedAudio,
}

impl DataType {
    pub fn is_video(self) -> bool {
        matches!(
            self,
            DataType::Rgb32Video | DataType::Yuv420Video | DataType::EncodedVideo
        )
    }

    pub fn is_audio(self) -> bool {
        matches!(self, DataType::RawAudio | DataType::EncodedAudio)
    }

    pub fn is_raw(self) -> bool {
        matches!(
            self,
            DataType::Rgb32Video | DataType::Yuv420Video | DataType::RawAudio
        )
    }
}

/// Where a unit originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Captured on this device
    Local,
    /// Received from the peer of the given session
    Remote(u32),
}

/// One frame or packet flowing through the graph
///
/// The payload is exclusively owned, cloning a unit copies it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUnit {
    pub kind: DataType,
    pub payload: Vec<u8>,
    /// Frame dimensions, 0 for audio
    pub width: u32,
    pub height: u32,
    /// Capture time
    pub presentation_time: Instant,
    pub source: Source,
    /// Frames per second, 0 for audio
    pub framerate: u32,
}

impl MediaUnit {
    pub fn video(kind: DataType, payload: Vec<u8>, width: u32, height: u32, framerate: u32) -> Self {
        Self {
            kind,
            payload,
            width,
            height,
            presentation_time: Instant::now(),
            source: Source::Local,
            framerate,
        }
    }

    pub fn audio(kind: DataType, payload: Vec<u8>) -> Self {
        Self {
            kind,
            payload,
            width: 0,
            height: 0,
            presentation_time: Instant::now(),
            source: Source::Local,
            framerate: 0,
        }
    }

    /// Mark the unit as received from `session`
    pub fn from_peer(mut self, session: u32) -> Self {
        self.source = Source::Remote(session);
        self
    }

    pub fn byte_length(&self) -> usize {
        self.payload.len()
    }

    /// Same metadata with a different kind and payload
    pub fn with_payload(&self, kind: DataType, payload: Vec<u8>) -> Self {
        Self {
            kind,
            payload,
            width: self.width,
            height: self.height,
            presentation_time: self.presentation_time,
            source: self.source,
            framerate: self.framerate,
        }
    }
}
