//! Concrete state handler functions and the state table builder.
//!
//! Each `on_update` runs one complete lifecycle stage against the modem and
//! returns where to go next.  Stage failures are logged as a [`LinkError`]
//! naming the stage and what its last reply looked like, then routed to
//! `ErrorState`, which restarts the modem until the restart budget runs out.

use log::{error, info, warn};

use super::context::{FsmContext, SessionFlags};
use super::{SleepReason, StateDescriptor, StateId, Transition};
use crate::apn;
use crate::app::ports::{Clock, SerialPort};
use crate::error::{LinkError, Operation};
use crate::modem::commands;
use crate::modem::parse::{self, SimStatus};
use crate::mqtt;
use crate::provision;

/// Build the state table.  Order must match [`StateId`].
pub fn build_state_table<P: SerialPort, C: Clock>() -> [StateDescriptor<P, C>; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::ProbeModem,
            name: "ProbeModem",
            on_enter: Some(probe_enter),
            on_exit: None,
            on_update: probe_update,
        },
        StateDescriptor {
            id: StateId::CheckSim,
            name: "CheckSim",
            on_enter: None,
            on_exit: None,
            on_update: check_sim_update,
        },
        StateDescriptor {
            id: StateId::RegisterNetwork,
            name: "RegisterNetwork",
            on_enter: None,
            on_exit: None,
            on_update: register_update,
        },
        StateDescriptor {
            id: StateId::ProvisionTls,
            name: "ProvisionTls",
            on_enter: None,
            on_exit: None,
            on_update: provision_update,
        },
        StateDescriptor {
            id: StateId::OpenGprs,
            name: "OpenGprs",
            on_enter: None,
            on_exit: None,
            on_update: gprs_update,
        },
        StateDescriptor {
            id: StateId::OpenMqtt,
            name: "OpenMqtt",
            on_enter: None,
            on_exit: None,
            on_update: mqtt_update,
        },
        StateDescriptor {
            id: StateId::PublishData,
            name: "PublishData",
            on_enter: None,
            on_exit: None,
            on_update: publish_update,
        },
        StateDescriptor {
            id: StateId::ErrorState,
            name: "ErrorState",
            on_enter: Some(error_enter),
            on_exit: None,
            on_update: error_update,
        },
    ]
}

/// Record `err` and head for the error state.
fn fail<P, C>(ctx: &mut FsmContext<P, C>, err: LinkError) -> Transition {
    error!("stage failed: {err}");
    ctx.last_error = Some(err);
    Transition::Next(StateId::ErrorState)
}

// ===========================================================================
// ProbeModem
// ===========================================================================

/// A fresh probe starts a fresh cycle: the modem may have just rebooted.
fn probe_enter<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) {
    ctx.flags = SessionFlags::default();
    ctx.broker_error = None;
    ctx.error_dwell_started_ms = None;
}

fn probe_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    let modem = &mut ctx.modem;
    modem.exchange(commands::FIX_BAUD_9600);
    modem.exchange(commands::FIX_BAUD_9600);

    let backoff = ctx.config.timing.probe_backoff_ms;
    let alive = modem.send_until(
        Operation::ModuleProbe,
        commands::ATTENTION,
        commands::OK,
        ctx.config.retries.module_probe,
        backoff,
    );
    if let Err(e) = alive {
        return fail(ctx, e);
    }
    info!("modem responding");

    for setup in [
        commands::FULL_FUNCTIONALITY,
        commands::QUERY_BAUD,
        commands::IDENTIFY,
        commands::QUERY_IMEI,
        commands::ECHO_OFF,
        commands::ENABLE_SLOW_CLOCK,
    ] {
        modem.exchange(setup);
    }
    Transition::Next(StateId::CheckSim)
}

// ===========================================================================
// CheckSim
// ===========================================================================

fn check_sim_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    let present = ctx.modem.send_until_with(
        Operation::SimProbe,
        commands::QUERY_ICCID,
        ctx.config.retries.sim_probe,
        ctx.config.timing.sim_backoff_ms,
        |r| parse::sim_status(r) == SimStatus::Present,
    );
    ctx.flags.sim_present = present.is_ok();
    if let Err(e) = present {
        let err = match parse::sim_status(&ctx.modem.response().text()) {
            SimStatus::NotInserted => LinkError::NoSim,
            _ => e,
        };
        return fail(ctx, err);
    }
    info!("SIM present");

    ctx.modem.exchange(commands::SIGNAL_QUALITY);
    Transition::Next(StateId::RegisterNetwork)
}

// ===========================================================================
// RegisterNetwork
// ===========================================================================

fn register_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    ctx.modem.pause(ctx.config.timing.stage_lead_in_ms);
    let registered = ctx.modem.send_until_with(
        Operation::Registration,
        commands::QUERY_REGISTRATION,
        ctx.config.retries.registration,
        ctx.config.timing.registration_backoff_ms,
        parse::registered,
    );
    if let Err(e) = registered {
        return fail(ctx, e);
    }
    info!("registered on network");
    Transition::Next(StateId::ProvisionTls)
}

// ===========================================================================
// ProvisionTls
// ===========================================================================

fn provision_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    let report = provision::provision(&mut ctx.modem, &ctx.certificates, &ctx.config.timing);
    if !report.all_uploaded() {
        if ctx.config.strict_provisioning {
            return fail(ctx, LinkError::RetriesExhausted(Operation::CertificateUpload));
        }
        warn!(
            "continuing with {}/3 credentials uploaded",
            report.uploaded_count()
        );
    }
    Transition::Next(StateId::OpenGprs)
}

// ===========================================================================
// OpenGprs
// ===========================================================================

fn gprs_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    apn::open_packet_context(&mut ctx.modem, &ctx.config);
    Transition::Next(StateId::OpenMqtt)
}

// ===========================================================================
// OpenMqtt
// ===========================================================================

/// Open, then connect even if the open failed.  Failures are kept for the
/// publish stage to surface.
fn mqtt_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    let open = mqtt::open_socket(&mut ctx.modem, &ctx.config);
    let connected = mqtt::connect(&mut ctx.modem, &ctx.config);
    ctx.flags.mqtt_already_open = open.is_ok();
    ctx.flags.mqtt_connected = connected.is_ok();
    ctx.broker_error = open.err().or(connected.err());
    ctx.flags.take_sensor_readings = true;
    Transition::Next(StateId::PublishData)
}

// ===========================================================================
// PublishData
// ===========================================================================

fn publish_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    let value = ctx.measurement.unwrap_or_else(|| {
        warn!("no reading supplied, publishing 0");
        0
    });
    let payload = mqtt::build_payload(value);
    let link_ready = ctx.flags.mqtt_connected || ctx.flags.mqtt_already_open;

    if let Err(e) = mqtt::publish(&mut ctx.modem, &ctx.config, &payload, link_ready) {
        // Without a link nothing was sent; blame the broker stage instead.
        let err = if link_ready { e } else { ctx.broker_error.unwrap_or(e) };
        return fail(ctx, err);
    }

    ctx.flags.data_published = true;
    mqtt::disconnect(&mut ctx.modem);
    ctx.error_retries.reset();
    Transition::Sleep(SleepReason::Published)
}

// ===========================================================================
// ErrorState
// ===========================================================================

fn error_enter<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) {
    ctx.flags.take_sensor_readings = false;
    warn!(
        "entering error state ({} of {} restarts used)",
        ctx.error_retries.count(),
        ctx.error_retries.ceiling()
    );
}

fn error_update<P: SerialPort, C: Clock>(ctx: &mut FsmContext<P, C>) -> Transition {
    ctx.flags.take_sensor_readings = false;

    if !ctx.error_retries.exhausted() {
        ctx.error_retries.record_failure();
        info!("restarting modem (attempt {})", ctx.error_retries.count());
        ctx.modem.exchange(commands::MINIMUM_FUNCTIONALITY);
        ctx.modem.pause(ctx.config.timing.restart_pause_ms);
        ctx.modem.exchange(commands::RESTART);
        return Transition::Next(StateId::ProbeModem);
    }

    if !ctx.fatal.is_raised() {
        error!("modem restarts exhausted, giving up this cycle");
        ctx.fatal.raise();
    }
    let now = ctx.modem.clock().now_ms();
    let started = *ctx.error_dwell_started_ms.get_or_insert(now);
    if now.saturating_sub(started) >= u64::from(ctx.config.timing.error_dwell_ms) {
        return Transition::Sleep(SleepReason::ErrorDwellExpired);
    }
    ctx.modem.pause(ctx.config.timing.error_pause_ms);
    Transition::Stay
}
