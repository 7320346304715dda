//! # Route
//!
//! A route is the ordered list of legs the pilot works through. Each leg
//! rounds one cone on a given side; the pilot runs the legs sequentially and
//! wraps back to the first, patrolling the course until killed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use util::nav::RotDir;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One leg of a route: proceed to a cone and round it on the given side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Position of the leg in the route.
    pub num: usize,

    /// Index of the cone this leg rounds, into the telemetry cone slots.
    pub cone: usize,

    /// Which way around the cone.
    pub side: RotDir,
}

/// The complete list of legs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<Leg>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Route {
    /// Plan a route over the given number of cones: one leg per cone in
    /// detection order, rounding sides alternating starting counter-clockwise.
    pub fn plan(num_cones: usize) -> Self {
        let legs = (0..num_cones)
            .map(|i| Leg {
                num: i,
                cone: i,
                side: if i % 2 == 0 { RotDir::Ccw } else { RotDir::Cw },
            })
            .collect();

        Self { legs }
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// The leg after the given one, wrapping to the start.
    pub fn next_leg(&self, num: usize) -> usize {
        if self.legs.is_empty() {
            0
        } else {
            (num + 1) % self.legs.len()
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plan() {
        let route = Route::plan(3);

        assert_eq!(route.len(), 3);
        for (i, leg) in route.legs.iter().enumerate() {
            assert_eq!(leg.num, i);
            assert_eq!(leg.cone, i);
        }
        assert_eq!(route.legs[0].side, RotDir::Ccw);
        assert_eq!(route.legs[1].side, RotDir::Cw);
        assert_eq!(route.legs[2].side, RotDir::Ccw);
    }

    #[test]
    fn test_next_leg_wraps() {
        let route = Route::plan(3);

        assert_eq!(route.next_leg(0), 1);
        assert_eq!(route.next_leg(2), 0);
    }

    #[test]
    fn test_empty_plan() {
        let route = Route::plan(0);
        assert!(route.is_empty());
        assert_eq!(route.next_leg(0), 0);
    }
}
