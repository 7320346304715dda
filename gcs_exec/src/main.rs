//! # Ground Control Executable
//!
//! The parent process of the stack. It owns the telemetry bus, spawns the
//! awacs and skate processes against it, and runs the consumer loop: poll
//! the bus, run the pilot over each fresh snapshot, and send the resulting
//! steering demand to the skate.
//!
//! # Shutdown
//!
//! Shutdown is two-phase. This process intercepts Ctrl-C and does nothing in
//! the handler except record the kill timestamp into the bus; every process
//! (this one included) then observes the flag on its own next poll tick and
//! exits cleanly. An externally set flag (e.g. a child hitting an
//! unrecoverable fault) takes the same path.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the ground control executable.
mod params;

/// Route following control.
mod pilot;

/// Route and leg definitions.
mod route;

/// Client used to send steering demands to the skate.
mod skate_client;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, trace, warn};
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

// Internal
use comms_if::{
    eqpt::skate::RcResponse,
    net::NetParams,
    telem::TelemetryBus,
};
use params::GcsExecParams;
use pilot::{Pilot, PilotInput};
use skate_client::{SkateClient, SkateClientError};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time::unix_time_seconds,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("gcs_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Ground Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: GcsExecParams =
        util::params::load("gcs_exec.toml").wrap_err("Could not load gcs params")?;

    let net_params: NetParams = util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- CREATE BUS ----

    let bus_path = session.session_root.join(&params.bus_file_name);
    let bus = TelemetryBus::create(&bus_path).wrap_err("Failed to create the telemetry bus")?;

    info!("Telemetry bus created at {:?}", bus_path);

    // Intercept Ctrl-C: record the kill timestamp and return. Children mask
    // the interrupt themselves and pick the flag up from the bus.
    let kill_bus =
        TelemetryBus::open(&bus_path).wrap_err("Failed to open the bus for the kill handler")?;
    ctrlc::set_handler(move || {
        if kill_bus.request_kill(unix_time_seconds()) {
            eprintln!("Interrupt: kill requested");
        }
    })
    .wrap_err("Failed to install the interrupt handler")?;

    // ---- SPAWN CHILD PROCESSES ----

    let mut children: Vec<(String, Child)> = Vec::new();

    if params.spawn_children {
        let cmds = [params.awacs_cmd.as_str(), params.skate_cmd.as_str()];
        for cmd in &cmds {
            let child = Command::new(cmd)
                .arg(&bus_path)
                .spawn()
                .wrap_err_with(|| format!("Failed to spawn {}", cmd))?;

            info!("Spawned {} (pid {})", cmd, child.id());
            children.push((String::from(*cmd), child));
        }
    } else {
        info!("Child spawning disabled, run children against {:?}", bus_path);
    }

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut skate_client = SkateClient::new(&zmq_ctx, &net_params)
        .wrap_err("Failed to initialise the SkateClient")?;

    info!("SkateClient initialised");

    // ---- INITIALISE MODULES ----

    let mut pilot = Pilot::default();
    pilot
        .init("pilot.toml", &session)
        .wrap_err("Failed to initialise the Pilot")?;

    info!("Pilot init complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_photo_s = 0.0;

    loop {
        // Cooperative shutdown: poll the kill flag each cycle
        if bus.kill_requested() {
            info!("Kill flag observed, stopping");
            break;
        }

        let snap = bus.snapshot();

        // Only steer on fresh photos; the bus is eventually consistent and
        // may replay the previous snapshot between publishes
        if snap.time_photo_s > last_photo_s {
            last_photo_s = snap.time_photo_s;

            match pilot.proc(&PilotInput {
                snap,
                dt_s: params.poll_period_s,
            }) {
                Ok((rc, report)) => {
                    trace!("Pilot report: {:?}", report);

                    if !report.idle {
                        // An undeliverable demand is an unknown outcome: log
                        // and carry on, the next cycle sends a fresh one
                        match skate_client.send_demands(&rc) {
                            Ok(RcResponse::DemsOk) => (),
                            Ok(r) => warn!("Non-nominal response from the skate: {:?}", r),
                            Err(SkateClientError::NotConnected) => {
                                warn!("Skate not connected, steering outcome unknown")
                            }
                            Err(e) => warn!("SkateClient error: {}", e),
                        }
                    }
                }
                Err(e) => warn!("Error during Pilot processing: {}", e),
            }
        }

        thread::sleep(Duration::from_secs_f64(params.poll_period_s));
    }

    // ---- SHUTDOWN ----

    for (name, mut child) in children {
        match child.wait() {
            Ok(status) => info!("{} exited: {}", name, status),
            Err(e) => warn!("Could not wait for {}: {}", name, e),
        }
    }

    info!("End of execution");

    Ok(())
}
