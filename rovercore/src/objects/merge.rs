use crate::config::MergeConfig;
use crate::geometry;

use super::DetectedObject;

/// Index of the first object in `earlier` that `newest` coincides with.
///
/// Two detections coincide when world x, world y, bearing and sonar distance all lie within the
/// configured windows.
pub fn find_duplicate(
    newest: &DetectedObject,
    earlier: &[DetectedObject],
    config: &MergeConfig,
) -> Option<usize> {
    let tol = config.distance_tolerance;
    earlier.iter().position(|other| {
        (newest.x - other.x).abs() <= tol
            && (newest.y - other.y).abs() <= tol
            && geometry::separation(newest.bearing, other.bearing) <= config.bearing_tolerance
            && (newest.sonar_distance - other.sonar_distance).abs() <= tol
    })
}

#[cfg(test)]
mod tests {
    use uom::si::{
        angle::degree,
        f64::{Angle, Length},
        length::centimeter,
    };

    use super::*;
    use crate::objects::{Category, ObjectTable};

    fn object(x: f64, y: f64, bearing: f64, distance: f64) -> DetectedObject {
        DetectedObject {
            category: Category::Small,
            angular_width: Angle::new::<degree>(6.0),
            linear_width: Length::new::<centimeter>(4.0),
            sonar_distance: Length::new::<centimeter>(distance),
            ir_distance: Length::new::<centimeter>(distance),
            bearing: Angle::new::<degree>(bearing),
            x: Length::new::<centimeter>(x),
            y: Length::new::<centimeter>(y),
        }
    }

    #[test]
    fn test_duplicate_is_removed() {
        let config = MergeConfig::default();
        let mut table = ObjectTable::<8>::new();
        table.push(object(10.0, 30.0, 70.0, 31.0)).unwrap();
        table.push(object(14.0, 25.0, 75.0, 28.0)).unwrap();

        assert_eq!(table.merge_last(&config), Some(0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), Some(&object(10.0, 30.0, 70.0, 31.0)));
    }

    #[test]
    fn test_distinct_objects_are_kept() {
        let config = MergeConfig::default();
        let mut table = ObjectTable::<8>::new();
        table.push(object(10.0, 30.0, 70.0, 31.0)).unwrap();
        // Close in position but seen under a different bearing.
        table.push(object(12.0, 31.0, 85.0, 31.0)).unwrap();
        assert_eq!(table.merge_last(&config), None);
        // Close in bearing but one axis out of the window.
        table.push(object(10.0, 40.0, 70.0, 31.0)).unwrap();
        assert_eq!(table.merge_last(&config), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_first_match_wins() {
        let config = MergeConfig::default();
        let earlier = [
            object(0.0, 100.0, 90.0, 100.0),
            object(10.0, 30.0, 70.0, 31.0),
            object(11.0, 31.0, 71.0, 32.0),
        ];
        let newest = object(10.5, 30.5, 70.5, 31.5);
        assert_eq!(find_duplicate(&newest, &earlier, &config), Some(1));
    }

    #[test]
    fn test_bearing_window_wraps() {
        let config = MergeConfig::default();
        let earlier = [object(20.0, 0.0, 358.0, 20.0)];
        let newest = object(20.0, 1.0, 2.0, 20.0);
        assert_eq!(find_duplicate(&newest, &earlier, &config), Some(0));
    }

    #[test]
    fn test_single_object_never_merges() {
        let mut table = ObjectTable::<8>::new();
        table.push(object(0.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(table.merge_last(&MergeConfig::default()), None);
        assert_eq!(table.len(), 1);
    }
}
