//! The bound on values a container may hold.

/// A value that can live in both host and accelerator memory.
///
/// Elements move between memory domains as raw bytes, so they must be
/// plain values: `Copy`, no drop glue, no interior pointers that would
/// dangle on the other side. Every `Copy + Send + Sync + 'static` type
/// qualifies through the blanket impl.
///
/// Device allocations are aligned to the platform's configured alignment
/// (at least 16 bytes). Types aligned more strictly than that are refused
/// when they are first placed on a device.
pub trait Element: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> Element for T {}
