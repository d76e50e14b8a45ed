use crate::unit::DataType;

/// Notifications about the state of the media graph
///
/// None of these end a call, they describe degraded media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// A filter's queue was full, reported on the first drop and then every
    /// [`drop_report_interval`](crate::GraphConfig::drop_report_interval)
    BufferOverflow { filter: String, dropped: u64 },
    FilterInitFailed { filter: String },
    /// A unit could not be processed and was dropped
    ProcessingFailed { filter: String },
    ConversionMissing { from: DataType, to: DataType },
    PeerAdded { session: u32 },
    PeerRemoved { session: u32 },
    /// The last peer left and the local capture chains were recreated,
    /// previously obtained camera and microphone handles are dead
    LocalGraphRebuilt,
}
