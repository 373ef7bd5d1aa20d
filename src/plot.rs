use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::snapshot::MonsterHp;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub elapsed_seconds: f64,
    pub value: f64,
}

/// A chart series shared between the sampler and any number of readers.
///
/// Cloning yields another handle to the same points. Writers and readers go
/// through the same lock; readers iterate the live points in place.
#[derive(Debug, Clone, Default)]
pub struct PlotSeries {
    points: Arc<Mutex<Vec<PlotPoint>>>,
}

impl PlotSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, point: PlotPoint) {
        self.points.lock().push(point);
    }

    pub fn clear(&self) {
        self.points.lock().clear();
    }

    /// Run `f` over the current points while holding the series lock.
    pub fn with_points<R>(&self, f: impl FnOnce(&[PlotPoint]) -> R) -> R {
        let points = self.points.lock();
        f(&points)
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }

    pub fn last(&self) -> Option<PlotPoint> {
        self.points.lock().last().copied()
    }
}

/// Conversion of a recorded value into a chart y value.
pub trait PlotValue {
    fn plot_value(&self) -> f64;
}

impl PlotValue for i32 {
    fn plot_value(&self) -> f64 {
        f64::from(*self)
    }
}

impl PlotValue for u32 {
    fn plot_value(&self) -> f64 {
        f64::from(*self)
    }
}

impl PlotValue for f64 {
    fn plot_value(&self) -> f64 {
        *self
    }
}

impl PlotValue for MonsterHp {
    fn plot_value(&self) -> f64 {
        f64::from(self.hp)
    }
}
