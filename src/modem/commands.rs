//! AT command vocabulary for the M95.
//!
//! Fixed commands are plain constants; parameterised ones are rendered into
//! a stack [`CommandLine`].  Line termination is added by the sender.

use core::fmt::Write;

use heapless::String;

/// Longest rendered command line (the broker host dominates).
pub const MAX_COMMAND_LEN: usize = 160;

pub type CommandLine = String<MAX_COMMAND_LEN>;

// --- Result tokens ---

pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const CME_ERROR: &str = "+CME ERROR:";
pub const CONNECT: &str = "CONNECT";

// --- Module bring-up ---

pub const ATTENTION: &str = "AT";
pub const FIX_BAUD_9600: &str = "AT+IPR=9600";
pub const QUERY_BAUD: &str = "AT+IPR?";
pub const FULL_FUNCTIONALITY: &str = "AT+CFUN=1";
pub const MINIMUM_FUNCTIONALITY: &str = "AT+CFUN=0";
pub const RESTART: &str = "AT+CFUN=1,1";
pub const IDENTIFY: &str = "ATI";
pub const QUERY_IMEI: &str = "AT+GSN";
pub const ECHO_OFF: &str = "ATE0";
pub const ENABLE_SLOW_CLOCK: &str = "AT+QSCLK=1";

// --- SIM and registration ---

pub const QUERY_ICCID: &str = "AT+CCID";
pub const SIGNAL_QUALITY: &str = "AT+CSQ";
pub const QUERY_REGISTRATION: &str = "AT+CREG?";
pub const QUERY_OPERATOR: &str = "AT+COPS?";
pub const QUERY_PIN: &str = "AT+CPIN?";
pub const QUERY_ATTACH: &str = "AT+CGATT?";

// --- Packet context ---

pub const NON_TRANSPARENT_MODE: &str = "AT+QIMODE=0";
pub const REGISTER_APP: &str = "AT+QIREGAPP";
pub const QUERY_CONTEXT: &str = "AT+QICSGP?";
pub const ACTIVATE_CONTEXT: &str = "AT+QIACT";
pub const QUERY_LOCAL_IP: &str = "AT+QILOCIP";

// --- MQTT / TLS ---

/// MQTT client 0 runs over SSL context 2.
pub const MQTT_USE_SSL: &str = r#"AT+QMTCFG="SSL",0,1,2"#;
pub const MQTT_DISCONNECT: &str = "AT+QMTDISC=0";

/// Terminates a streamed certificate upload.
pub const UPLOAD_TERMINATOR: &[u8] = b"\r\n";
/// Terminates a publish payload.
pub const PAYLOAD_TERMINATOR: &[u8] = &[0x1A, 0x1A];

/// SSL context settings applied after the certificates are in place.
pub const TLS_PROFILE: [&str; 7] = [
    r#"AT+QSSLCFG="cacert",2,"RAM:cacert.pem""#,
    r#"AT+QSSLCFG="clientcert",2,"RAM:client.pem""#,
    r#"AT+QSSLCFG="clientkey",2,"RAM:user_key.pem""#,
    r#"AT+QSSLCFG="seclevel",2,2"#,
    r#"AT+QSSLCFG="sslversion",2,4"#,
    r#"AT+QSSLCFG="ciphersuite",2,"0xFFFF""#,
    r#"AT+QSSLCFG="ignorertctime",1"#,
];

fn render(args: core::fmt::Arguments<'_>) -> CommandLine {
    let mut line = CommandLine::new();
    // Inputs are bounded by the config field capacities, which all fit.
    let _ = line.write_fmt(args);
    line
}

/// `AT+QSECWRITE="<file>",<len>,<timeout>`
pub fn secure_write(file: &str, len: usize, timeout_secs: u16) -> CommandLine {
    render(format_args!(r#"AT+QSECWRITE="{file}",{len},{timeout_secs}"#))
}

/// `AT+QSECREAD="<file>"`
pub fn secure_read(file: &str) -> CommandLine {
    render(format_args!(r#"AT+QSECREAD="{file}""#))
}

/// `AT+QICSGP=1,"<apn>"`
pub fn set_apn(apn: &str) -> CommandLine {
    render(format_args!(r#"AT+QICSGP=1,"{apn}""#))
}

/// `AT+QMTOPEN=0,"<host>",<port>`
pub fn mqtt_open(host: &str, port: u16) -> CommandLine {
    render(format_args!(r#"AT+QMTOPEN=0,"{host}",{port}"#))
}

/// `AT+QMTCONN=0,"<client id>"`
pub fn mqtt_connect(client_id: &str) -> CommandLine {
    render(format_args!(r#"AT+QMTCONN=0,"{client_id}""#))
}

/// `AT+QMTPUB=0,0,0,0,"<topic>"`
pub fn mqtt_publish(topic: &str) -> CommandLine {
    render(format_args!(r#"AT+QMTPUB=0,0,0,0,"{topic}""#))
}
