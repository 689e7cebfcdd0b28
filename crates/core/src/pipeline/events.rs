/// Events the pipeline surfaces to its hosting application.
///
/// The UI layer (outside this crate) consumes these from a channel;
/// the loops never block on a slow consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// Periodic throughput sample, averaged over the report period.
    AvgFps(f64),
    /// Terminal: the acquisition loop released its resources.
    Finished,
    /// The preview surface was closed externally; the hosting UI
    /// should reconcile its preview toggle.
    PreviewToggle,
}

/// Lifecycle of the pipeline as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No camera attached.
    Idle,
    Running,
    /// Cooperative shutdown in progress.
    Stopping,
}
