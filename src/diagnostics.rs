//! Optional timing and counting instrumentation.
//!
//! Nothing in here changes what a table or a traversal returns. Timings are
//! only taken with the `std` feature; without it every duration reads as
//! zero while call counts are still kept.

use core::fmt;
use core::time::Duration;

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        #[derive(Clone, Copy)]
        pub(crate) struct Stopwatch(std::time::Instant);

        impl Stopwatch {
            #[inline(always)]
            pub(crate) fn start() -> Self {
                Stopwatch(std::time::Instant::now())
            }

            #[inline(always)]
            pub(crate) fn elapsed(&self) -> Duration {
                self.0.elapsed()
            }
        }
    } else {
        #[derive(Clone, Copy)]
        pub(crate) struct Stopwatch;

        impl Stopwatch {
            #[inline(always)]
            pub(crate) fn start() -> Self {
                Stopwatch
            }

            #[inline(always)]
            pub(crate) fn elapsed(&self) -> Duration {
                Duration::ZERO
            }
        }
    }
}

/// Counters kept by a table around its raw key reads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyReadStatistics {
    /// Number of raw key reads since the last reset.
    pub reads: u64,
    /// Cumulative time spent inside those reads. Zero unless the table was
    /// created with diagnostics enabled.
    pub read_time: Duration,
}

impl fmt::Display for KeyReadStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table internal key time: {} ms over {} calls",
            self.read_time.as_millis(),
            self.reads
        )
    }
}

/// Diagnostic capability a [`Table`](crate::table::Table) may expose.
///
/// Callers probe for it with [`Table::diagnostics`](crate::table::Table::diagnostics)
/// instead of inspecting the concrete table type.
pub trait TableDiagnostics {
    /// Current key-read counters.
    fn key_read_statistics(&self) -> KeyReadStatistics;

    /// Zeroes the counters. Calling it twice in a row is the same as calling
    /// it once.
    fn reset(&self);
}

/// Timing breakdown of one instrumented key traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitStatistics {
    /// Table capacity at traversal start.
    pub capacity: usize,
    /// Number of live keys at traversal start.
    pub size: usize,
    /// Slots inspected before the traversal ended.
    pub slots_scanned: usize,
    /// Live keys handed to the visitor.
    pub visited: usize,
    /// Whether the visitor asked to stop.
    pub stopped_early: bool,
    /// Wall time of the whole traversal.
    pub elapsed: Duration,
    /// Time spent reading keys out of slots.
    pub key_lookup: Duration,
    /// Time spent inside the visitor.
    pub visitor: Duration,
    /// Key-read counters of the table, when it exposes them.
    pub key_reads: Option<KeyReadStatistics>,
}

impl fmt::Display for VisitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visit {} slots of {} in {} ms; table size is {}, visited {}{}; key lookup total {} ms, visitor total {} ms",
            self.slots_scanned,
            self.capacity,
            self.elapsed.as_millis(),
            self.size,
            self.visited,
            if self.stopped_early { " (stopped early)" } else { "" },
            self.key_lookup.as_millis(),
            self.visitor.as_millis(),
        )?;
        if let Some(key_reads) = self.key_reads {
            write!(f, "; {key_reads}")?;
        }
        Ok(())
    }
}
