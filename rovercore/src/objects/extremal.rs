//! Post-sweep selection of the smallest and the closest object.

use crate::config::ClosestMetric;

use super::{DetectedObject, ObjectTable};

/// The scanned object with the smallest linear width. Hazards carry no width and are skipped;
/// on ties the earlier object wins.
pub fn smallest<const N: usize>(table: &ObjectTable<N>) -> Option<(usize, &DetectedObject)> {
    let mut best: Option<(usize, &DetectedObject)> = None;
    for (index, object) in table.iter().enumerate() {
        if object.category.is_hazard() {
            continue;
        }
        match best {
            Some((_, current)) if object.linear_width >= current.linear_width => {}
            _ => best = Some((index, object)),
        }
    }
    best
}

/// The closest scanned object according to `metric`. Hazards are skipped, their IR distance is
/// never measured.
///
/// With [`ClosestMetric::Either`] an object replaces the current pick as soon as *one* of its
/// distances is smaller, so the pick's IR distance is not necessarily the smallest IR distance in
/// the table.
pub fn closest<const N: usize>(
    table: &ObjectTable<N>,
    metric: ClosestMetric,
) -> Option<(usize, &DetectedObject)> {
    let closer = |object: &DetectedObject, current: &DetectedObject| match metric {
        ClosestMetric::Either => {
            object.sonar_distance < current.sonar_distance
                || object.ir_distance < current.ir_distance
        }
        ClosestMetric::Sonar => object.sonar_distance < current.sonar_distance,
    };
    let mut best: Option<(usize, &DetectedObject)> = None;
    for (index, object) in table.iter().enumerate() {
        if object.category.is_hazard() {
            continue;
        }
        match best {
            Some((_, current)) if !closer(object, current) => {}
            _ => best = Some((index, object)),
        }
    }
    best
}
