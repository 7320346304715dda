//! # Skate Executable
//!
//! The actuation process. It serves steering demands from the gcs and drives
//! the helm servo through the serial actuator link. With no valid demand
//! arriving the helm is put amidships and the process sits in safe mode
//! until demands resume.
//!
//! The process is spawned by `gcs_exec` with the bus file path as its only
//! argument. Ctrl-C is masked; shutdown arrives through the bus kill flag,
//! polled between demands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Driver for the helm servo.
mod actuator;

/// Parameters for the skate executable.
mod params;

/// Steering demand server abstraction.
mod skate_server;

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

// Internal
use actuator::Actuator;
use comms_if::{
    eqpt::actuator::{ActuatorLine, ANGLE_AMIDSHIPS, ANGLE_MAX},
    eqpt::skate::{RcCommand, RcResponse, RC_CHANNEL_LIMIT},
    telem::TelemetryBus,
};
use params::SkateExecParams;
use skate_server::SkateServer;
use util::{
    logger::{logger_init, LevelFilter},
    maths::lin_map,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("skate_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Skate Actuation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- BUS ----

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err(eyre!(
            "Expected the bus file path as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    let bus = TelemetryBus::open(&args[1]).wrap_err("Failed to open the telemetry bus")?;

    info!("Telemetry bus mapped from {:?}", &args[1]);

    // Mask Ctrl-C; shutdown comes from the bus kill flag
    ctrlc::set_handler(|| {}).wrap_err("Failed to mask the interrupt signal")?;

    // ---- LOAD PARAMETERS ----

    let params: SkateExecParams =
        util::params::load("skate_exec.toml").wrap_err("Could not load skate params")?;

    let net_params = util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- SERVER INITIALISATION ----

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut server =
        SkateServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the server")?;

    info!("SkateServer initialised");

    // ---- ACTUATOR INITIALISATION ----

    // A missing actuator is an unknown-outcome collaborator, not a fatal
    // fault: demands are still served and logged
    let mut actuator = if params.dry_run {
        info!("Dry run, helm angles will be logged only");
        None
    } else {
        match Actuator::open(
            &params.serial_device,
            params.serial_baud,
            params.serial_timeout_ms,
        ) {
            Ok(a) => {
                info!("Actuator opened on {}", params.serial_device);
                Some(a)
            }
            Err(e) => {
                warn!("Actuator not connected: {}", e);
                None
            }
        }
    };

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop in safe mode");

    let mut safe_mode = true;

    loop {
        // Cooperative shutdown: the receive timeout bounds how long this
        // poll can be deferred
        if bus.kill_requested() {
            info!("Kill flag observed, stopping");
            break;
        }

        // Get a demand from the client
        let dems = match server.get_demands() {
            Some(d) => d,
            None => {
                if !safe_mode {
                    warn!("Demands stopped, entering safe mode");
                    safe_mode = true;
                    actuate(&mut actuator, ANGLE_AMIDSHIPS);
                }
                continue;
            }
        };

        trace!("Recieved demand: {:?}", dems);

        // Reject invalid demands
        if !dems.is_valid() {
            warn!("Recieved invalid demand: {:?}", dems);
            if let Err(e) = server.send_response(&RcResponse::DemsInvalid) {
                warn!("Couldn't send response to client: {}", e);
            }
            continue;
        }

        if safe_mode {
            info!("Recieved valid demand, exiting safe mode");
            safe_mode = false;
        }

        // Acknowledge before actuating so the client is never held up by
        // the serial link
        if let Err(e) = server.send_response(&RcResponse::DemsOk) {
            warn!("Couldn't send response to client, entering safe mode: {}", e);
            safe_mode = true;
            continue;
        }

        actuate(&mut actuator, helm_angle_from_roll(&dems));
    }

    // ---- SHUTDOWN ----

    // Ask the actuator to terminate as well
    if let Some(ref mut act) = actuator {
        if let Err(e) = act.send(&ActuatorLine::Quit) {
            warn!("Could not send quit to the actuator: {}", e);
        }
    }

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map the demand's roll channel onto a helm servo angle.
fn helm_angle_from_roll(dems: &RcCommand) -> i64 {
    lin_map(
        (-RC_CHANNEL_LIMIT, RC_CHANNEL_LIMIT),
        (0.0, ANGLE_MAX as f64),
        dems.roll,
    )
    .round() as i64
}

/// Drive the helm to the given angle, if an actuator is attached.
///
/// Failures are logged and swallowed: the outcome is unknown and the caller
/// must not retry or assume success.
fn actuate(actuator: &mut Option<Actuator>, angle: i64) {
    let line = match ActuatorLine::angle(angle) {
        Ok(l) => l,
        Err(e) => {
            warn!("Refusing helm demand: {}", e);
            return;
        }
    };

    match actuator {
        Some(act) => {
            if let Err(e) = act.send(&line) {
                warn!("Actuator write failed, outcome unknown: {}", e);
            }
        }
        None => trace!("No actuator, helm angle {} dropped", angle),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_helm_angle_from_roll() {
        let dems = |roll| RcCommand {
            roll,
            ..Default::default()
        };

        assert_eq!(helm_angle_from_roll(&dems(0.0)), 90);
        assert_eq!(helm_angle_from_roll(&dems(-100.0)), 0);
        assert_eq!(helm_angle_from_roll(&dems(100.0)), 180);
        assert_eq!(helm_angle_from_roll(&dems(50.0)), 135);
    }
}
