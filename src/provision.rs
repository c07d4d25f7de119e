//! TLS credential provisioning.
//!
//! Streams the CA certificate, client certificate and client key into the
//! modem's RAM file system, then points SSL context 2 at them.  The modem
//! announces readiness for each blob with `CONNECT`; the declared length is
//! always the blob's actual length.
//!
//! Provisioning is best-effort: a missing prompt is logged and the sequence
//! carries on, and nothing is verified afterwards.  The caller decides from
//! the [`ProvisionReport`] whether that is acceptable.

use heapless::Vec;
use log::{info, warn};

use crate::app::ports::{CertSourceError, Clock, SerialPort};
use crate::config::Timing;
use crate::modem::Modem;
use crate::modem::commands::{self, CONNECT, UPLOAD_TERMINATOR};

/// Maximum certificate size (PEM, headers included).
pub const MAX_CERT_SIZE: usize = 4096;

/// Maximum private key size.
pub const MAX_KEY_SIZE: usize = 2048;

/// PEM material for the broker's mutual-TLS session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateBundle {
    pub ca_cert: Vec<u8, MAX_CERT_SIZE>,
    pub client_cert: Vec<u8, MAX_CERT_SIZE>,
    pub client_key: Vec<u8, MAX_KEY_SIZE>,
}

impl CertificateBundle {
    /// Copy the three blobs into fixed-capacity storage.
    pub fn from_pem(ca_cert: &[u8], client_cert: &[u8], client_key: &[u8]) -> Result<Self, CertSourceError> {
        Ok(Self {
            ca_cert: Vec::from_slice(ca_cert).map_err(|()| CertSourceError::TooLarge("CA certificate"))?,
            client_cert: Vec::from_slice(client_cert)
                .map_err(|()| CertSourceError::TooLarge("client certificate"))?,
            client_key: Vec::from_slice(client_key).map_err(|()| CertSourceError::TooLarge("client key"))?,
        })
    }

    #[cfg(test)]
    pub fn is_complete(&self) -> bool {
        !self.ca_cert.is_empty() && !self.client_cert.is_empty() && !self.client_key.is_empty()
    }
}

/// One modem-side credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialFile {
    /// Path in the modem's file system.
    pub path: &'static str,
    /// Upload timeout the modem enforces, in seconds.
    pub upload_timeout_secs: u16,
}

pub const CA_CERT_FILE: CredentialFile = CredentialFile {
    path: "RAM:cacert.pem",
    upload_timeout_secs: 200,
};
pub const CLIENT_CERT_FILE: CredentialFile = CredentialFile {
    path: "RAM:client.pem",
    upload_timeout_secs: 100,
};
pub const CLIENT_KEY_FILE: CredentialFile = CredentialFile {
    path: "RAM:user_key.pem",
    upload_timeout_secs: 100,
};

/// Which uploads got their `CONNECT` prompt, in CA, cert, key order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub uploaded: [bool; 3],
}

impl ProvisionReport {
    pub fn all_uploaded(&self) -> bool {
        self.uploaded.iter().all(|&u| u)
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded.iter().filter(|&&u| u).count()
    }
}

/// Run the full provisioning sequence.
pub fn provision<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    bundle: &CertificateBundle,
    timing: &Timing,
) -> ProvisionReport {
    modem.exchange(commands::MQTT_USE_SSL);

    let files = [
        (CA_CERT_FILE, bundle.ca_cert.as_slice()),
        (CLIENT_CERT_FILE, bundle.client_cert.as_slice()),
        (CLIENT_KEY_FILE, bundle.client_key.as_slice()),
    ];

    let mut report = ProvisionReport::default();
    for (slot, (file, blob)) in report.uploaded.iter_mut().zip(files) {
        *slot = upload(modem, file, blob, timing);
    }

    for (file, _) in files {
        modem.send_command(&commands::secure_read(file.path));
        modem.pause(timing.cert_readback_delay_ms);
        modem.read_response();
    }

    for setting in commands::TLS_PROFILE {
        modem.exchange(setting);
    }

    info!(
        "TLS provisioning done: {}/3 credentials uploaded",
        report.uploaded_count()
    );
    report
}

/// Announce one file, stream it on `CONNECT`, return whether it went out.
fn upload<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    file: CredentialFile,
    blob: &[u8],
    timing: &Timing,
) -> bool {
    if blob.is_empty() {
        warn!("{}: no credential loaded, skipping upload", file.path);
        return false;
    }
    modem.send_command(&commands::secure_write(
        file.path,
        blob.len(),
        file.upload_timeout_secs,
    ));
    let outcome = modem.wait_for(CONNECT, timing.cert_prompt_timeout_ms);
    if !outcome.is_found() {
        warn!("{}: no upload prompt ({outcome:?})", file.path);
        return false;
    }
    modem.send_raw(blob);
    modem.send_raw(UPLOAD_TERMINATOR);
    modem.read_response();
    info!("{}: uploaded {} bytes", file.path, blob.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim_modem::ScriptedModem;
    use crate::adapters::time::SimClock;

    fn bundle() -> CertificateBundle {
        CertificateBundle::from_pem(b"CA-PEM\n", b"CERT-PEM\n", b"KEY-PEM\n").unwrap()
    }

    fn modem(script: ScriptedModem) -> Modem<ScriptedModem, SimClock> {
        Modem::new(script, SimClock::new(), &Timing::default())
    }

    #[test]
    fn declares_actual_blob_lengths() {
        let mut m = modem(
            ScriptedModem::new()
                .on_prefix("AT+QSECWRITE=", "CONNECT\r\n")
                .on_upload("+QSECWRITE: 7,1a2b\r\n\r\nOK\r\n")
                .with_default("OK\r\n"),
        );
        let report = provision(&mut m, &bundle(), &Timing::default());
        assert!(report.all_uploaded());

        let port = m.port();
        assert!(port.sent(r#"AT+QSECWRITE="RAM:cacert.pem",7,200"#));
        assert!(port.sent(r#"AT+QSECWRITE="RAM:client.pem",9,100"#));
        assert!(port.sent(r#"AT+QSECWRITE="RAM:user_key.pem",8,100"#));
        assert_eq!(
            port.uploads(),
            [b"CA-PEM\n".to_vec(), b"CERT-PEM\n".to_vec(), b"KEY-PEM\n".to_vec()]
        );
    }

    #[test]
    fn runs_the_full_command_sequence_in_order() {
        let mut m = modem(
            ScriptedModem::new()
                .on_prefix("AT+QSECWRITE=", "CONNECT\r\n")
                .with_default("OK\r\n"),
        );
        provision(&mut m, &bundle(), &Timing::default());

        let sent = m.port().commands();
        assert_eq!(sent.first().map(String::as_str), Some(commands::MQTT_USE_SSL));
        let readbacks: std::vec::Vec<_> =
            sent.iter().filter(|c| c.starts_with("AT+QSECREAD=")).collect();
        assert_eq!(readbacks.len(), 3);
        assert_eq!(&sent[sent.len() - 7..], commands::TLS_PROFILE.map(str::to_owned));
    }

    #[test]
    fn missing_prompt_skips_the_blob_and_continues() {
        let mut m = modem(
            ScriptedModem::new()
                .on_prefix("AT+QSECWRITE=\"RAM:cacert.pem\"", "ERROR\r\n")
                .on_prefix("AT+QSECWRITE=", "CONNECT\r\n")
                .with_default("OK\r\n"),
        );
        let report = provision(&mut m, &bundle(), &Timing::default());
        assert_eq!(report.uploaded, [false, true, true]);
        assert_eq!(m.port().uploads().len(), 2);
        assert!(m.port().sent(commands::TLS_PROFILE[6]));
    }

    #[test]
    fn silent_modem_waits_out_each_prompt() {
        let mut m = modem(ScriptedModem::new());
        let report = provision(&mut m, &bundle(), &Timing::default());
        assert_eq!(report.uploaded_count(), 0);
        assert!(m.clock().now_ms() >= 3 * 10_000);
    }

    #[test]
    fn empty_bundle_uploads_nothing() {
        let mut m = modem(ScriptedModem::new().with_default("CONNECT\r\n"));
        let report = provision(&mut m, &CertificateBundle::default(), &Timing::default());
        assert_eq!(report.uploaded_count(), 0);
        assert!(m.port().uploads().is_empty());
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let big = [b'x'; MAX_KEY_SIZE + 1];
        assert_eq!(
            CertificateBundle::from_pem(b"a", b"b", &big),
            Err(CertSourceError::TooLarge("client key"))
        );
    }
}
