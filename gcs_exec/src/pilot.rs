//! # Pilot
//!
//! Route-following control. Each telemetry snapshot is turned into one RC
//! steering command: proceed along the current leg, detect leg completion,
//! and wrap back to the first leg so the course is patrolled continuously
//! until killed.
//!
//! Position comes from the donut fix in telemetry. Heading is estimated from
//! successive fixes (the skate carries no usable compass); until two
//! distinct fixes exist the yaw channel stays centred.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::route::Route;
use comms_if::eqpt::skate::RcCommand;
use comms_if::telem::TelemetrySnapshot;
use util::nav::{
    fold_heading_err, heading_of_line, is_point_past_line, length_of_arc, rc_from_target,
    theta_from_point,
};
use util::{module::State, params, session::Session};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Pilot module state.
#[derive(Default)]
pub struct Pilot {
    params: Params,

    route: Route,
    leg: usize,
    leg_start: Option<Vector2<f64>>,
    leg_eta_s: Option<f64>,
    leg_elapsed_s: f64,

    prev_pos: Option<Vector2<f64>>,
    heading_deg: Option<f64>,
}

/// Input data to the pilot.
pub struct PilotInput {
    /// The latest telemetry snapshot.
    pub snap: TelemetrySnapshot,

    /// Time since the previous processing cycle in seconds.
    pub dt_s: f64,
}

/// Pilot parameters.
#[derive(Deserialize, Clone)]
pub struct Params {
    /// Gain applied to the target offset before it becomes RC channels
    pub approach_gain: f64,

    /// Radius of the turn flown around a cone, arena pixels
    pub turn_radius_px: f64,

    /// Assumed cruise speed used for leg ETAs, arena pixels per second
    pub cruise_speed_px_s: f64,

    /// A leg is overdue once its elapsed time exceeds eta times this margin
    pub eta_margin: f64,

    /// Minimum distance between fixes for a heading estimate, arena pixels
    pub min_fix_dist_px: f64,
}

/// Status report for pilot processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True when there was nothing to steer by this cycle.
    pub idle: bool,

    /// Index of the leg being flown.
    pub leg: usize,

    /// Total legs in the route.
    pub num_legs: usize,

    /// Current heading error in degrees.
    pub hdg_err_deg: f64,

    /// ETA of the current leg in seconds.
    pub leg_eta_s: f64,

    /// True when the current leg has exceeded its ETA margin.
    pub overdue: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur during pilot processing.
#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("Leg {leg} refers to cone {cone} which is not in telemetry")]
    BadConeIndex { leg: usize, cone: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            approach_gain: 0.5,
            turn_radius_px: 40.0,
            cruise_speed_px_s: 120.0,
            eta_margin: 2.0,
            min_fix_dist_px: 2.0,
        }
    }
}

impl State for Pilot {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = PilotInput;
    type OutputData = RcCommand;
    type StatusReport = StatusReport;
    type ProcError = PilotError;

    /// Initialise the pilot.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Perform cyclic processing of the pilot.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();
        let snap = &input_data.snap;

        // Nothing to steer by before the first photo or without cones
        if snap.time_photo_s == 0.0 || snap.num_cones() == 0 {
            report.idle = true;
            return Ok((RcCommand::default(), report));
        }

        let cones: Vec<Vector2<f64>> = snap
            .cones()
            .iter()
            .map(|c| Vector2::new(c[0] as f64, c[1] as f64))
            .collect();

        // Replan whenever the cone set changes size
        if self.route.len() != cones.len() {
            self.route = Route::plan(cones.len());
            self.leg = 0;
            self.leg_start = None;
            self.leg_eta_s = None;
            self.leg_elapsed_s = 0.0;
            info!("Route planned: {} legs", self.route.len());
        }

        let pos = Vector2::new(snap.donut_x as f64, snap.donut_y as f64);

        // Heading from successive fixes
        if let Some(prev) = self.prev_pos {
            if (pos - prev).norm() >= self.params.min_fix_dist_px {
                self.heading_deg = Some(heading_of_line(&prev, &pos));
            }
        }
        self.prev_pos = Some(pos);

        let leg = self.route.legs[self.leg];
        let target = match cones.get(leg.cone) {
            Some(t) => *t,
            None => {
                return Err(PilotError::BadConeIndex {
                    leg: leg.num,
                    cone: leg.cone,
                })
            }
        };
        let start = *self.leg_start.get_or_insert(pos);

        // On leg start estimate the run: the straight to the cone plus the
        // arc flown around it towards the next leg
        let eta_s = match self.leg_eta_s {
            Some(t) => t,
            None => {
                let dist = (target - start).norm();
                let (entry_theta, _) = theta_from_point(&start, &target);
                let next_cone = self.route.legs[self.route.next_leg(self.leg)].cone;
                let (exit_theta, _) = theta_from_point(&cones[next_cone], &target);
                let arc = length_of_arc(entry_theta, exit_theta, leg.side, self.params.turn_radius_px);

                let t = (dist + arc) / self.params.cruise_speed_px_s;
                self.leg_eta_s = Some(t);
                self.leg_elapsed_s = 0.0;
                t
            }
        };

        self.leg_elapsed_s += input_data.dt_s;
        if self.leg_elapsed_s > eta_s * self.params.eta_margin {
            report.overdue = true;
            warn!(
                "Leg {} overdue: {:.1} s elapsed against an eta of {:.1} s",
                leg.num, self.leg_elapsed_s, eta_s
            );
        }

        // Leg complete once the fix projects past the cone
        if is_point_past_line(&start, &target, &pos) {
            info!("Leg {} complete", leg.num);
            self.leg = self.route.next_leg(self.leg);
            self.leg_start = Some(pos);
            self.leg_eta_s = None;
            self.leg_elapsed_s = 0.0;
        }

        // Steer towards the (possibly just advanced) leg target
        let leg = self.route.legs[self.leg];
        let target = match cones.get(leg.cone) {
            Some(t) => *t,
            None => {
                return Err(PilotError::BadConeIndex {
                    leg: leg.num,
                    cone: leg.cone,
                })
            }
        };

        let hdg_err_deg = match self.heading_deg {
            Some(h) => fold_heading_err(heading_of_line(&pos, &target) - h),
            None => 0.0,
        };

        let rc = rc_from_target(&((target - pos) * self.params.approach_gain), hdg_err_deg);

        report.leg = self.leg;
        report.num_legs = self.route.len();
        report.hdg_err_deg = hdg_err_deg;
        report.leg_eta_s = eta_s;

        Ok((rc, report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn snap(donut: [i32; 2], cones: &[[i32; 2]]) -> TelemetrySnapshot {
        let mut s = TelemetrySnapshot::default();
        s.time_photo_s = 1.0;
        s.donut_x = donut[0];
        s.donut_y = donut[1];
        s.set_cones(cones);
        s.num_legs = s.num_cones() as i32;
        s
    }

    fn pilot() -> Pilot {
        Pilot::default()
    }

    #[test]
    fn test_idle_without_photo_or_cones() {
        let mut p = pilot();

        let (rc, report) = p
            .proc(&PilotInput {
                snap: TelemetrySnapshot::default(),
                dt_s: 0.25,
            })
            .unwrap();
        assert!(report.idle);
        assert_eq!(rc, RcCommand::default());

        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([10, 10], &[]),
                dt_s: 0.25,
            })
            .unwrap();
        assert!(report.idle);
    }

    #[test]
    fn test_steers_towards_first_cone() {
        let mut p = pilot();

        let (rc, report) = p
            .proc(&PilotInput {
                snap: snap([100, 100], &[[100, 200], [200, 200]]),
                dt_s: 0.25,
            })
            .unwrap();

        assert!(!report.idle);
        assert_eq!(report.leg, 0);
        assert_eq!(report.num_legs, 2);

        // Cone dead ahead in +y: pure pitch, no roll, centred yaw
        assert_eq!(rc.roll, 0.0);
        assert!(rc.pitch > 0.0);
        assert_eq!(rc.yaw, 0.0);
        assert!(rc.throttle > 0.0);
    }

    #[test]
    fn test_leg_advances_when_past_cone() {
        let mut p = pilot();
        let cones = [[100, 200], [200, 200]];

        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([100, 100], &cones),
                dt_s: 0.25,
            })
            .unwrap();
        assert_eq!(report.leg, 0);

        // Fix now projects past the first cone along the leg
        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([100, 210], &cones),
                dt_s: 0.25,
            })
            .unwrap();
        assert_eq!(report.leg, 1);

        // And past the second cone the route wraps to the start
        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([210, 205], &cones),
                dt_s: 0.25,
            })
            .unwrap();
        assert_eq!(report.leg, 0);
    }

    #[test]
    fn test_replan_on_cone_count_change() {
        let mut p = pilot();

        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([100, 100], &[[100, 200], [200, 200]]),
                dt_s: 0.25,
            })
            .unwrap();
        assert_eq!(report.num_legs, 2);

        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([100, 100], &[[100, 200], [200, 200], [300, 100]]),
                dt_s: 0.25,
            })
            .unwrap();
        assert_eq!(report.num_legs, 3);
        assert_eq!(report.leg, 0);
    }

    #[test]
    fn test_overdue_leg_is_flagged() {
        let mut p = pilot();
        p.params.cruise_speed_px_s = 1.0e6;

        let (_, report) = p
            .proc(&PilotInput {
                snap: snap([100, 100], &[[100, 200]]),
                dt_s: 1000.0,
            })
            .unwrap();

        assert!(report.overdue);
    }
}
