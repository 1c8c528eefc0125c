use bitflags::bitflags;

/// Default bound on the number of cached readers and writers.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

bitflags! {
    /// Switches that change how values are read or written.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// Indent JSON output.
        const PRETTY_PRINT = 1 << 0;
        /// Reject wire fields with no matching property instead of skipping them.
        const FAIL_ON_UNKNOWN_PROPERTIES = 1 << 1;
        /// Write enum constants as their ordinal instead of their name.
        const WRITE_ENUMS_USING_INDEX = 1 << 2;
        /// Write `SystemTime` as epoch milliseconds; otherwise as ISO-8601 text.
        const WRITE_DATES_AS_TIMESTAMPS = 1 << 3;
    }
}

impl Default for Features {
    #[inline]
    fn default() -> Self {
        Self::WRITE_DATES_AS_TIMESTAMPS
    }
}

/// Settings of one [`Binder`](crate::Binder).
///
/// # Examples
///
/// ```
/// use vc_bind::{BindConfig, Features};
///
/// let config = BindConfig::default()
///     .with_reader_cache_capacity(64)
///     .with_feature(Features::PRETTY_PRINT, true);
/// assert!(config.has(Features::PRETTY_PRINT));
/// assert_eq!(config.reader_cache_capacity, 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindConfig {
    /// Resolved readers kept before the reader cache is reset. At least 1.
    pub reader_cache_capacity: usize,
    /// Resolved writers kept before the writer cache is reset. At least 1.
    pub writer_cache_capacity: usize,
    pub features: Features,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            reader_cache_capacity: DEFAULT_CACHE_CAPACITY,
            writer_cache_capacity: DEFAULT_CACHE_CAPACITY,
            features: Features::default(),
        }
    }
}

impl BindConfig {
    #[inline]
    pub fn with_reader_cache_capacity(mut self, capacity: usize) -> Self {
        self.reader_cache_capacity = capacity.max(1);
        self
    }

    #[inline]
    pub fn with_writer_cache_capacity(mut self, capacity: usize) -> Self {
        self.writer_cache_capacity = capacity.max(1);
        self
    }

    /// Turns `feature` on or off.
    #[inline]
    pub fn with_feature(mut self, feature: Features, enabled: bool) -> Self {
        self.features.set(feature, enabled);
        self
    }

    #[inline]
    pub fn has(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }
}
