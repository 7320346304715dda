//! # Awacs Executable
//!
//! The overhead detection process. Each cycle it takes the next frame from
//! the frame source, runs the detection pipeline over it, and publishes the
//! detected positions into the telemetry bus for the gcs to consume.
//!
//! The process is spawned by `gcs_exec` with the bus file path as its only
//! argument. It never reacts to Ctrl-C directly: the interrupt is masked and
//! shutdown arrives through the bus kill flag, polled once per cycle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Detection pipeline and detector collaborators.
mod detect;

/// Frame enumeration and caching.
mod frame_store;

/// Label records and annotation files.
mod label;

/// Detector model file management.
mod model;

/// Parameters for the awacs executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, trace, warn};
use std::env;
use std::thread;
use std::time::Duration;

// Internal
use comms_if::telem::{TelemetryBus, TelemetrySnapshot};
use detect::DetectionPipeline;
use frame_store::{Frame, FrameCache};
use label::{Label, LabelFormat, CLS_CONE, CLS_DONUT};
use model::Model;
use params::AwacsExecParams;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time::unix_time_seconds,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cache name of frames that have been published to the bus.
const PUBLISHED_CACHE: &str = "published";

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("awacs_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Awacs Detection Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- BUS ----

    // The one argument is the path of the bus file created by the gcs
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err(eyre!(
            "Expected the bus file path as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    let mut bus = TelemetryBus::open(&args[1]).wrap_err("Failed to open the telemetry bus")?;

    info!("Telemetry bus mapped from {:?}", &args[1]);

    // Mask Ctrl-C so a terminal interrupt cannot tear this process down
    // mid-publish. Shutdown comes from the bus kill flag instead.
    ctrlc::set_handler(|| {}).wrap_err("Failed to mask the interrupt signal")?;

    // ---- LOAD PARAMETERS ----

    let params: AwacsExecParams =
        util::params::load("awacs_exec.toml").wrap_err("Could not load awacs params")?;

    info!("Exec parameters loaded");

    let root = host::get_sk8_sw_root().wrap_err("Failed to get software root")?;
    let frame_dir = root.join(&params.frame_dir);
    let truth_dir = root.join(&params.truth_dir);

    // ---- INITIALISE MODULES ----

    let model =
        Model::load(&root.join(&params.model_file)).wrap_err("Failed to load the model file")?;
    info!("Model loaded: {} entries", model.entries.len());

    let mut pipeline = DetectionPipeline::default();
    pipeline
        .init((model, truth_dir), &session)
        .wrap_err("Failed to initialise the detection pipeline")?;
    info!("DetectionPipeline init complete");

    // Labels directory for saved annotations
    let labels_dir = session.session_root.join("labels");
    if params.save_labels {
        std::fs::create_dir_all(&labels_dir).wrap_err("Failed to create the labels directory")?;
    }

    // ---- FRAME SOURCE ----

    let frames = match frame_store::list_frames(&frame_dir, params.exclude_zero_frame) {
        Ok(f) => f,
        Err(e) => {
            // An unreadable frame directory means no data, not a crash; the
            // loop will idle until killed
            warn!("Could not list frames in {:?}: {}", frame_dir, e);
            Vec::new()
        }
    };

    info!("{} frames found in {:?}", frames.len(), frame_dir);

    // The frame cache is explicit process state, cleared at the start of
    // each independent run
    let mut cache = FrameCache::default();
    cache.clear();

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut frame_idx = 0usize;

    loop {
        // Cooperative shutdown: poll the kill flag each cycle
        if bus.kill_requested() {
            info!("Kill flag observed, stopping");
            break;
        }

        // Take the next frame, wrapping or idling when the list runs out
        let fnum = match frames.get(frame_idx) {
            Some(f) => f,
            None => {
                if params.loop_frames && !frames.is_empty() {
                    frame_idx = 0;
                    continue;
                }
                trace!("No frame this cycle");
                thread::sleep(Duration::from_secs_f64(params.cycle_period_s));
                continue;
            }
        };
        frame_idx += 1;

        // A frame that fails to load is skipped, never fatal
        let frame = match Frame::load(&frame_dir, fnum) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not load frame {}: {}", fnum, e);
                continue;
            }
        };
        let photo_time_s = unix_time_seconds();

        // ---- DETECTION ----

        let labels = match pipeline.proc(&frame) {
            Ok((labels, report)) => {
                trace!(
                    "Frame {}: {:?} labels per detector",
                    fnum,
                    report.labels_per_detector
                );
                labels
            }
            Err(e) => {
                warn!("Error during pipeline processing: {}", e);
                continue;
            }
        };

        trace!("{}", label::format(&labels, LabelFormat::Realtime));

        // ---- PUBLISH ----

        let snap = snapshot_from_labels(&labels, photo_time_s);
        bus.publish(&snap);

        if params.save_labels {
            let path = labels_dir.join(format!("{}.csv", fnum));
            if let Err(e) = label::write_annotations(&labels, &path) {
                warn!("Could not write annotations for frame {}: {}", fnum, e);
            }
        }

        cache.cache(PUBLISHED_CACHE, frame);

        // ---- CYCLE MANAGEMENT ----

        thread::sleep(Duration::from_secs_f64(params.cycle_period_s));
    }

    // ---- SHUTDOWN ----

    info!(
        "End of execution, {} frames published",
        cache.cached(PUBLISHED_CACHE).len()
    );

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the telemetry snapshot from one frame's labels.
///
/// The donut position comes from the first donut label, cones from the cone
/// labels in detection order. The planned route runs one leg per cone, so
/// the leg count is published alongside.
fn snapshot_from_labels(labels: &[Label], photo_time_s: f64) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    snap.time_photo_s = photo_time_s;

    if let Some(donut) = labels.iter().find(|l| l.cls == CLS_DONUT) {
        snap.donut_x = donut.cx;
        snap.donut_y = donut.cy;
    }

    let cones: Vec<[i32; 2]> = labels
        .iter()
        .filter(|l| l.cls == CLS_CONE)
        .map(|l| [l.cx, l.cy])
        .collect();

    snap.set_cones(&cones);
    snap.num_legs = snap.num_cones() as i32;

    snap
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::label::CLS_SK8;

    #[test]
    fn test_snapshot_from_labels() {
        let labels = vec![
            Label::from_bbox(CLS_CONE, 100, 100, 20, 20),
            Label::from_bbox(CLS_DONUT, 300, 300, 10, 10),
            Label::from_bbox(CLS_CONE, 200, 150, 20, 20),
            Label::from_bbox(CLS_SK8, 290, 290, 40, 30),
        ];

        let snap = snapshot_from_labels(&labels, 17.5);

        assert_eq!(snap.time_photo_s, 17.5);
        assert_eq!((snap.donut_x, snap.donut_y), (305, 305));
        assert_eq!(snap.cones(), &[[110, 110], [210, 160]]);
        assert_eq!(snap.num_legs, 2);
    }

    #[test]
    fn test_snapshot_from_no_labels() {
        let snap = snapshot_from_labels(&[], 1.0);

        assert_eq!(snap.num_cones(), 0);
        assert_eq!(snap.num_legs, 0);
        assert_eq!((snap.donut_x, snap.donut_y), (0, 0));
    }
}
