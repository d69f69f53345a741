//! Tracy profiling support.
//!
//! With the `tracy` feature, `tracing` spans from round resolution and the
//! analyzer are reported to Tracy. Call [`init_tracy()`] early in main, then
//! connect the Tracy GUI or capture tool.
//!
//! Every analyzer chunk emits a frame marker through [`frame_mark_chunk`].

/// Trace level for Tracy profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceLevel {
    /// Only capture INFO level spans (default, lowest overhead)
    #[default]
    Info,
    /// Per-round spans
    Debug,
    /// Everything, including per-cohort events
    Trace,
}

impl std::str::FromStr for TraceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(TraceLevel::Info),
            "debug" => Ok(TraceLevel::Debug),
            "trace" => Ok(TraceLevel::Trace),
            _ => Err(format!(
                "Invalid trace level: {}. Use info, debug, or trace.",
                s
            )),
        }
    }
}

/// Initialize the Tracy tracing subscriber.
///
/// Must be called before any span is created. Without the `tracy` feature
/// this is a no-op.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
#[cfg(feature = "tracy")]
pub fn init_tracy(level: TraceLevel) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let filter = match level {
        TraceLevel::Info => LevelFilter::INFO,
        TraceLevel::Debug => LevelFilter::DEBUG,
        TraceLevel::Trace => LevelFilter::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_tracy::TracyLayer::default())
        .with(filter)
        .init();
}

/// No-op when tracy feature is disabled.
#[cfg(not(feature = "tracy"))]
pub fn init_tracy(_level: TraceLevel) {}

/// Emit a Tracy frame marker at the end of an analyzer chunk.
#[cfg(feature = "tracy")]
#[inline]
pub fn frame_mark_chunk() {
    tracy_client::secondary_frame_mark!("chunk");
}

/// No-op when tracy feature is disabled.
#[cfg(not(feature = "tracy"))]
#[inline]
pub fn frame_mark_chunk() {}
