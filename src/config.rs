use crate::error::Error;
use crate::error::Result;
use crate::table::MAX_NEIGHBORHOOD;

/// Default number of slots in a freshly created table.
pub const DEFAULT_CAPACITY: usize = 1 << 10;

/// Default neighborhood size. Every key is found within this many slots of
/// its home slot.
pub const DEFAULT_NEIGHBORHOOD: usize = 32;

/// Default capacity multiplier applied when a table grows.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Default fraction of slots that may be occupied before the table grows
/// ahead of an insert.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.9;

/// Construction parameters of a [`HopScotchCollection`](crate::HopScotchCollection).
///
/// # Examples
///
/// ```rust
/// use hop_prim::HopScotchConfig;
///
/// let config = HopScotchConfig::default()
///     .initial_capacity(1000)
///     .neighborhood(16)
///     .diagnostics(true);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.table_capacity(), 1024);
///
/// assert!(HopScotchConfig::default().neighborhood(64).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HopScotchConfig {
    initial_capacity: usize,
    neighborhood: usize,
    growth_factor: usize,
    load_factor: f32,
    diagnostics: bool,
}

impl Default for HopScotchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            neighborhood: DEFAULT_NEIGHBORHOOD,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            load_factor: DEFAULT_LOAD_FACTOR,
            diagnostics: false,
        }
    }
}

impl HopScotchConfig {
    /// Number of slots requested for the first table. Rounded up to a power of
    /// two no smaller than the neighborhood.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Requests enough slots for `keys` keys to be inserted without growing.
    ///
    /// The slot count is `keys / load_factor`, so set the load factor first.
    /// With an out-of-range load factor `keys` is used as is and
    /// [`validate`](Self::validate) reports the load factor.
    ///
    /// ```rust
    /// use hop_prim::HopScotchConfig;
    ///
    /// let config = HopScotchConfig::default().for_keys(1000);
    /// assert_eq!(config.table_capacity(), 2048);
    ///
    /// let config = HopScotchConfig::default().load_factor(1.0).for_keys(1000);
    /// assert_eq!(config.table_capacity(), 1024);
    /// ```
    pub fn for_keys(mut self, keys: usize) -> Self {
        let load_factor = self.load_factor as f64;
        if !(load_factor > 0.0 && load_factor <= 1.0) {
            self.initial_capacity = keys;
            return self;
        }

        let mut slots = (keys as f64 / load_factor).ceil() as usize;
        if ((slots as f64 * load_factor) as usize) < keys {
            slots = slots.saturating_add(1);
        }
        self.initial_capacity = slots;
        self
    }

    /// Neighborhood size `H`, between 1 and [`MAX_NEIGHBORHOOD`].
    pub fn neighborhood(mut self, neighborhood: usize) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    /// Capacity multiplier applied on growth. Must be a power of two of at
    /// least 2 so capacities stay powers of two.
    pub fn growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Occupancy fraction in `(0, 1]` above which an insert grows the table
    /// before placing its key.
    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Enables per-call timing counters on tables that support them and
    /// instrumented key traversals.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Checks every parameter against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.neighborhood == 0 || self.neighborhood > MAX_NEIGHBORHOOD {
            return Err(Error::InvalidConfiguration {
                message: "neighborhood must be between 1 and 32",
            });
        }
        if self.growth_factor < 2 || !self.growth_factor.is_power_of_two() {
            return Err(Error::InvalidConfiguration {
                message: "growth factor must be a power of two of at least 2",
            });
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidConfiguration {
                message: "load factor must be in (0, 1]",
            });
        }
        if self.initial_capacity.checked_next_power_of_two().is_none() {
            return Err(Error::CapacityOverflow);
        }
        Ok(())
    }

    /// Slot count of the first table.
    pub fn table_capacity(&self) -> usize {
        self.initial_capacity
            .max(self.neighborhood)
            .max(1)
            .next_power_of_two()
    }

    pub(crate) fn neighborhood_size(&self) -> usize {
        self.neighborhood
    }

    pub(crate) fn growth(&self) -> usize {
        self.growth_factor
    }

    pub(crate) fn load(&self) -> f32 {
        self.load_factor
    }

    pub(crate) fn diagnostics_enabled(&self) -> bool {
        self.diagnostics
    }
}

/// Largest size a table of `capacity` slots may reach before an insert grows
/// it. Never below 1 so a table always accepts its first key.
pub(crate) fn max_load(capacity: usize, load_factor: f32) -> usize {
    ((capacity as f64 * load_factor as f64) as usize).clamp(1, capacity)
}
