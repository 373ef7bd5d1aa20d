use log::{debug, trace};
use serde::Serialize;
use std::any::Any;

use crate::plot::{PlotPoint, PlotSeries, PlotValue};
use crate::quantity::Quantity;
use crate::snapshot::{ClockDirection, Frames, ItemSlot, MonsterHp, QuestClock, Snapshot};

// ─── History ────────────────────────────────────────────────────────

/// Key-ordered record of one quantity over a session.
///
/// Entries are kept sorted in the clock direction and never contain the same
/// key twice. A key behind the last entry is inserted in place.
#[derive(Debug, Clone)]
pub struct History<T> {
    direction: ClockDirection,
    entries: Vec<(Frames, T)>,
}

impl<T> History<T> {
    pub fn new(direction: ClockDirection) -> Self {
        Self {
            direction,
            entries: Vec::new(),
        }
    }

    pub fn direction(&self) -> ClockDirection {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<(Frames, &T)> {
        self.entries.last().map(|(k, v)| (*k, v))
    }

    pub fn last_key(&self) -> Option<Frames> {
        self.entries.last().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Frames, &T)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = Frames> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    fn position(&self, key: Frames) -> Result<usize, usize> {
        match self.direction {
            ClockDirection::CountUp => self.entries.binary_search_by(|(k, _)| k.cmp(&key)),
            ClockDirection::CountDown => self.entries.binary_search_by(|(k, _)| key.cmp(k)),
        }
    }

    pub fn contains_key(&self, key: Frames) -> bool {
        self.position(key).is_ok()
    }

    pub fn get(&self, key: Frames) -> Option<&T> {
        self.position(key).ok().map(|i| &self.entries[i].1)
    }

    /// Whether `key` sorts after every recorded key.
    pub fn is_ahead(&self, key: Frames) -> bool {
        self.last_key()
            .map_or(true, |last| self.direction.advances(last, key))
    }

    /// Insert `value` at `key`. Returns false, leaving the history untouched,
    /// when the key is already present.
    pub fn push(&mut self, key: Frames, value: T) -> bool {
        match self.position(key) {
            Ok(_) => false,
            Err(index) => {
                self.entries.insert(index, (key, value));
                true
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Serialize> Serialize for History<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

// ─── Tracked quantity ───────────────────────────────────────────────

/// A value that can be diffed tick to tick.
pub trait SampleValue: Clone + Default {
    fn same_as(&self, other: &Self) -> bool;
}

macro_rules! sample_by_eq {
    ($($t:ty),*) => {
        $(impl SampleValue for $t {
            fn same_as(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

sample_by_eq!(i32, u32, MonsterHp, ItemSlot);

/// Bitwise, so an unchanged NaN reads as unchanged.
impl SampleValue for f64 {
    fn same_as(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: SampleValue + Copy, const N: usize> SampleValue for [T; N]
where
    [T; N]: Default,
{
    fn same_as(&self, other: &Self) -> bool {
        self.iter().zip(other).all(|(a, b)| a.same_as(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Recorded,
    Unchanged,
    /// The value changed, but this key is already recorded.
    DuplicateKey,
    /// The snapshot carried no reading for this quantity.
    Unavailable,
}

/// Reads one quantity out of a snapshot.
pub type Accessor<T> = fn(&Snapshot, &QuestClock) -> Option<T>;

/// Previous value plus history for one quantity.
pub struct TrackedQuantity<T> {
    quantity: Quantity,
    read: Accessor<T>,
    previous: T,
    history: History<T>,
    plot: Option<(PlotSeries, fn(&T) -> f64)>,
}

impl<T> TrackedQuantity<T> {
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }

    pub fn history(&self) -> &History<T> {
        &self.history
    }
}

impl<T: SampleValue> TrackedQuantity<T> {
    pub fn new(quantity: Quantity, direction: ClockDirection, read: Accessor<T>) -> Self {
        Self {
            quantity,
            read,
            previous: T::default(),
            history: History::new(direction),
            plot: None,
        }
    }

    /// Diff `current` against the previous value and record it at the
    /// clock key if it changed.
    pub fn observe(&mut self, current: T, clock: &QuestClock) -> SampleOutcome {
        if current.same_as(&self.previous) {
            return SampleOutcome::Unchanged;
        }
        if self.history.contains_key(clock.key) {
            trace!("{}: key {} already recorded, skipping", self.quantity, clock.key);
            return SampleOutcome::DuplicateKey;
        }
        if !self.history.is_ahead(clock.key) {
            debug!(
                "{}: key {} is behind the last entry, inserting in order",
                self.quantity, clock.key
            );
        }
        if let Some((series, to_plot)) = &self.plot {
            series.push(PlotPoint {
                elapsed_seconds: clock.elapsed_seconds_at(clock.key),
                value: to_plot(&current),
            });
        }
        self.previous = current.clone();
        self.history.push(clock.key, current);
        SampleOutcome::Recorded
    }
}

impl<T: SampleValue + PlotValue> TrackedQuantity<T> {
    /// Also append every recorded value to `series`.
    pub fn with_plot(mut self, series: PlotSeries) -> Self {
        let to_plot: fn(&T) -> f64 = <T as PlotValue>::plot_value;
        self.plot = Some((series, to_plot));
        self
    }
}

// ─── Type-erased tracking ───────────────────────────────────────────

/// Object-safe view of a `TrackedQuantity<T>`, so quantities of different
/// value types can be sampled from one list.
pub trait Track: Send {
    fn quantity(&self) -> Quantity;
    fn sample(&mut self, snapshot: &Snapshot, clock: &QuestClock) -> SampleOutcome;
    fn reset(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn plot(&self) -> Option<&PlotSeries>;
    fn export(&self) -> serde_json::Result<serde_json::Value>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Track for TrackedQuantity<T>
where
    T: SampleValue + Serialize + Send + 'static,
{
    fn quantity(&self) -> Quantity {
        self.quantity
    }

    fn sample(&mut self, snapshot: &Snapshot, clock: &QuestClock) -> SampleOutcome {
        match (self.read)(snapshot, clock) {
            Some(current) => self.observe(current, clock),
            None => {
                trace!("{}: no reading this tick", self.quantity);
                SampleOutcome::Unavailable
            }
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.previous = T::default();
        if let Some((series, _)) = &self.plot {
            series.clear();
        }
    }

    fn len(&self) -> usize {
        self.history.len()
    }

    fn plot(&self) -> Option<&PlotSeries> {
        self.plot.as_ref().map(|(series, _)| series)
    }

    fn export(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.history)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
