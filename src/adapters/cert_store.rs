//! Certificate store: reads the TLS credentials from the flash file system.
//!
//! On ESP-IDF the SPIFFS partition is mounted at `/spiffs` through the VFS,
//! so plain `std::fs` reads reach it.  On the host the same adapter reads
//! from any directory.
//!
//! ## File layout
//!
//! | File                | Content                          |
//! |---------------------|----------------------------------|
//! | `CACert.crt`        | PEM-encoded broker CA chain      |
//! | `ClientCert.crt`    | PEM-encoded client certificate   |
//! | `ClientPrivate.key` | PEM-encoded client private key   |

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{CertSourceError, CertificateSource};
use crate::provision::CertificateBundle;

/// SPIFFS mount point on the device.
pub const SPIFFS_BASE: &str = "/spiffs";

pub const CA_CERT_NAME: &str = "CACert.crt";
pub const CLIENT_CERT_NAME: &str = "ClientCert.crt";
pub const CLIENT_KEY_NAME: &str = "ClientPrivate.key";

/// Reads the credential files from one directory.
pub struct FsCertStore {
    dir: PathBuf,
}

impl FsCertStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, name: &'static str) -> Result<Vec<u8>, CertSourceError> {
        let path = self.dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("CertStore: {} missing", path.display());
                Err(CertSourceError::NotFound(name))
            }
            Err(e) => {
                warn!("CertStore: reading {} failed: {}", path.display(), e);
                Err(CertSourceError::ReadFailed)
            }
        }
    }
}

impl CertificateSource for FsCertStore {
    fn load_bundle(&self) -> Result<CertificateBundle, CertSourceError> {
        let ca = self.read(CA_CERT_NAME)?;
        let cert = self.read(CLIENT_CERT_NAME)?;
        let key = self.read(CLIENT_KEY_NAME)?;
        let bundle = CertificateBundle::from_pem(&ca, &cert, &key)?;
        info!(
            "CertStore: loaded certificate bundle (ca={}B, cert={}B, key={}B)",
            bundle.ca_cert.len(),
            bundle.client_cert.len(),
            bundle.client_key.len(),
        );
        Ok(bundle)
    }
}

/// Mount the SPIFFS partition at [`SPIFFS_BASE`], formatting it if the
/// mount fails.
#[cfg(target_os = "espidf")]
pub fn mount_spiffs() -> Result<(), CertSourceError> {
    use esp_idf_svc::sys::*;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    // SAFETY: `conf` outlives the call; the VFS copies what it keeps.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK {
        warn!("CertStore: SPIFFS mount failed ({})", ret);
        return Err(CertSourceError::ReadFailed);
    }
    info!("CertStore: SPIFFS mounted at {}", SPIFFS_BASE);
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gsmlink-certs-{}-{}", std::process::id(), tag));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_all_three_files() {
        let dir = scratch_dir("ok");
        std::fs::write(dir.join(CA_CERT_NAME), b"CA").unwrap();
        std::fs::write(dir.join(CLIENT_CERT_NAME), b"CERT").unwrap();
        std::fs::write(dir.join(CLIENT_KEY_NAME), b"KEY").unwrap();

        let bundle = FsCertStore::new(&dir).load_bundle().unwrap();
        assert!(bundle.is_complete());
        assert_eq!(bundle.client_key.as_slice(), b"KEY");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join(CA_CERT_NAME), b"CA").unwrap();
        std::fs::write(dir.join(CLIENT_CERT_NAME), b"CERT").unwrap();

        let err = FsCertStore::new(&dir).load_bundle().unwrap_err();
        assert_eq!(err, CertSourceError::NotFound(CLIENT_KEY_NAME));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_device_path() {
        let store = FsCertStore::new(SPIFFS_BASE);
        assert_eq!(store.dir(), Path::new("/spiffs"));
    }
}
