/// Configuration of the media graph
///
/// ```
/// use vcall_filter_graph::GraphConfig;
///
/// let config = GraphConfig {
///     self_view: false,
///     ..GraphConfig::default()
/// };
///
/// assert_eq!(config.queue_capacity, 50);
/// ```
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Number of units a filter buffers before dropping new ones
    pub queue_capacity: usize,
    /// Report the 1st and then every n-th dropped unit of a filter
    pub drop_report_interval: u64,
    /// Show the local camera picture
    pub self_view: bool,
    /// Sessions at or above this are refused
    pub max_sessions: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 50,
            drop_report_interval: 100,
            self_view: true,
            max_sessions: 1024,
        }
    }
}
