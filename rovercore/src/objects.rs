//! The map of everything the rover has found: scanned objects and hazards share one table.

pub mod extremal;
pub mod merge;

use heapless::Vec;
use serde::{Deserialize, Serialize};
use uom::si::f64::{Angle, Length};

use crate::config::MergeConfig;
use crate::error::Error;
use crate::geometry;
use crate::pose::Pose;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Unclassified,
    Small,
    Medium,
    Large,
    Cliff,
    WhiteTape,
    RedTape,
    /// Something flat enough to reach the bumper without showing up in a sweep.
    Flat,
}

impl Category {
    pub fn is_hazard(&self) -> bool {
        matches!(
            self,
            Category::Cliff | Category::WhiteTape | Category::RedTape | Category::Flat
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub category: Category,
    pub angular_width: Angle,
    pub linear_width: Length,
    /// Distance from the robot, kept current by [`ObjectTable::refresh`].
    pub sonar_distance: Length,
    pub ir_distance: Length,
    /// Absolute world bearing from the robot, kept current by [`ObjectTable::refresh`].
    pub bearing: Angle,
    pub x: Length,
    pub y: Length,
}

impl DetectedObject {
    /// A hazard met at `(x, y)` while heading along `bearing`. Hazards have no size and sit
    /// right at the robot when they are logged.
    pub fn hazard(category: Category, x: Length, y: Length, bearing: Angle) -> Self {
        debug_assert!(category.is_hazard());
        Self {
            category,
            angular_width: Angle::default(),
            linear_width: Length::default(),
            sonar_distance: Length::default(),
            ir_distance: Length::default(),
            bearing: geometry::normalize(bearing),
            x,
            y,
        }
    }
}

/// Result of [`ObjectTable::refresh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Objects whose bearing had to be fixed because they lie straight above or below the robot.
    pub degenerate: usize,
}

/// Detected objects in detection order. An index identifies an object until the table is cleared.
#[derive(Clone, Debug, Default)]
pub struct ObjectTable<const N: usize> {
    objects: Vec<DetectedObject, N>,
}

impl<const N: usize> ObjectTable<N> {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DetectedObject> {
        self.objects.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectedObject> {
        self.objects.iter()
    }

    pub fn as_slice(&self) -> &[DetectedObject] {
        &self.objects
    }

    /// Appends `object` and returns its index. A full table rejects the new object and keeps
    /// every existing one.
    pub fn push(&mut self, object: DetectedObject) -> Result<usize, Error> {
        self.objects
            .push(object)
            .map_err(|_| Error::TableFull { capacity: N })?;
        Ok(self.objects.len() - 1)
    }

    /// Drops the newest object when it duplicates an earlier one and returns the index of the
    /// earlier object it matched.
    pub fn merge_last(&mut self, config: &MergeConfig) -> Option<usize> {
        let (newest, earlier) = self.objects.split_last()?;
        let index = merge::find_duplicate(newest, earlier, config)?;
        self.objects.pop();
        Some(index)
    }

    /// Recomputes distance and bearing of every object as seen from `pose`.
    pub fn refresh(&mut self, pose: &Pose) -> RefreshReport {
        let mut report = RefreshReport::default();
        for object in self.objects.iter_mut() {
            let dx = object.x - pose.x;
            let dy = object.y - pose.y;
            let bearing = geometry::bearing(dx, dy);
            if bearing.is_degenerate() {
                report.degenerate += 1;
            }
            object.sonar_distance = geometry::distance(dx, dy);
            object.bearing = bearing.angle();
        }
        report
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{angle::degree, length::centimeter};

    use super::*;

    fn cm(value: f64) -> Length {
        Length::new::<centimeter>(value)
    }

    fn deg(value: f64) -> Angle {
        Angle::new::<degree>(value)
    }

    fn object_at(x: f64, y: f64) -> DetectedObject {
        DetectedObject {
            category: Category::Unclassified,
            angular_width: deg(5.0),
            linear_width: cm(3.0),
            sonar_distance: cm(0.0),
            ir_distance: cm(0.0),
            bearing: deg(0.0),
            x: cm(x),
            y: cm(y),
        }
    }

    #[test]
    fn test_push_rejects_when_full() {
        let mut table = ObjectTable::<2>::new();
        assert_eq!(table.push(object_at(0.0, 1.0)), Ok(0));
        assert_eq!(table.push(object_at(0.0, 2.0)), Ok(1));
        assert_eq!(
            table.push(object_at(0.0, 3.0)),
            Err(Error::TableFull { capacity: 2 })
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).map(|o| o.y), Some(cm(2.0)));
    }

    #[test]
    fn test_refresh() {
        let mut table = ObjectTable::<4>::new();
        table.push(object_at(10.0, 10.0)).unwrap();
        table.push(object_at(-3.0, 4.0)).unwrap();
        let pose = Pose::new(cm(0.0), cm(0.0), deg(90.0));

        let report = table.refresh(&pose);
        assert_eq!(report, RefreshReport::default());

        let first = table.get(0).unwrap();
        assert_relative_eq!(
            first.sonar_distance.get::<centimeter>(),
            200f64.sqrt(),
            epsilon = 1e-9
        );
        assert_relative_eq!(first.bearing.get::<degree>(), 45.0, epsilon = 1e-9);
        let second = table.get(1).unwrap();
        assert_relative_eq!(second.sonar_distance.get::<centimeter>(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(
            second.bearing.get::<degree>(),
            180.0 - 4f64.atan2(3.0).to_degrees(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut table = ObjectTable::<4>::new();
        table.push(object_at(12.0, -7.0)).unwrap();
        table.push(object_at(-1.0, 30.0)).unwrap();
        let pose = Pose::new(cm(2.0), cm(3.0), deg(10.0));

        table.refresh(&pose);
        let once = table.clone();
        table.refresh(&pose);
        assert_eq!(once.as_slice(), table.as_slice());
    }

    #[test]
    fn test_refresh_degenerate_bearing() {
        let mut table = ObjectTable::<4>::new();
        table.push(object_at(5.0, 20.0)).unwrap();
        table.push(object_at(5.0, -20.0)).unwrap();
        let pose = Pose::new(cm(5.0), cm(0.0), deg(0.0));

        let report = table.refresh(&pose);
        assert_eq!(report.degenerate, 2);
        assert_relative_eq!(table.get(0).unwrap().bearing.get::<degree>(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(table.get(1).unwrap().bearing.get::<degree>(), 270.0, epsilon = 1e-9);
        assert_relative_eq!(
            table.get(1).unwrap().sonar_distance.get::<centimeter>(),
            20.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_clear() {
        let mut table = ObjectTable::<4>::new();
        table.push(object_at(1.0, 1.0)).unwrap();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 4);
    }
}
