//! Carrier classification and packet-data context setup.
//!
//! The operator name in the `AT+COPS?` reply picks the APN.  Only the two
//! configured carriers are known; on any other network the APN command is
//! skipped and the modem keeps whatever context it already has.

use log::{info, warn};

use crate::app::ports::{Clock, SerialPort};
use crate::config::SessionConfig;
use crate::modem::Modem;
use crate::modem::commands;
use crate::modem::parse;

/// Which configured carrier the modem is camped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierProfile {
    Unknown,
    CarrierA,
    CarrierB,
}

/// Classify an operator query reply.  Carrier A wins if both names appear.
pub fn classify_operator(response: &str, config: &SessionConfig) -> CarrierProfile {
    let matches = |name: &str| !name.is_empty() && response.contains(name);
    if matches(&config.carrier_a.operator_match) {
        CarrierProfile::CarrierA
    } else if matches(&config.carrier_b.operator_match) {
        CarrierProfile::CarrierB
    } else {
        CarrierProfile::Unknown
    }
}

/// APN for an operator query reply, if the carrier is known.
pub fn select_apn<'a>(response: &str, config: &'a SessionConfig) -> Option<&'a str> {
    match classify_operator(response, config) {
        CarrierProfile::CarrierA => Some(config.carrier_a.apn.as_str()),
        CarrierProfile::CarrierB => Some(config.carrier_b.apn.as_str()),
        CarrierProfile::Unknown => None,
    }
}

/// What the packet-context sequence observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketContextReport {
    pub carrier: CarrierProfile,
    pub apn_configured: bool,
    pub gprs_attached: bool,
}

/// Configure and activate the GPRS context.  Nothing here is verified;
/// a context that did not come up shows as an MQTT open failure later.
pub fn open_packet_context<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    config: &SessionConfig,
) -> PacketContextReport {
    modem.pause(config.timing.stage_lead_in_ms);

    let operator = modem.exchange(commands::QUERY_OPERATOR).text().into_owned();
    let carrier = classify_operator(&operator, config);
    let apn = select_apn(&operator, config);

    modem.exchange(commands::QUERY_PIN);

    let gprs_attached = parse::gprs_attached(&modem.exchange(commands::QUERY_ATTACH).text());
    if gprs_attached {
        info!("GPRS attached");
    } else {
        warn!("GPRS not attached yet");
    }

    modem.exchange(commands::NON_TRANSPARENT_MODE);

    match apn {
        Some(apn) => {
            info!("carrier {carrier:?}, APN {apn}");
            modem.exchange(&commands::set_apn(apn));
        }
        None => warn!("unknown carrier, keeping the modem's APN"),
    }

    modem.exchange(commands::REGISTER_APP);
    modem.exchange(commands::QUERY_CONTEXT);
    modem.exchange(commands::ACTIVATE_CONTEXT);
    modem.exchange(commands::QUERY_LOCAL_IP);

    PacketContextReport {
        carrier,
        apn_configured: apn.is_some(),
        gprs_attached,
    }
}
