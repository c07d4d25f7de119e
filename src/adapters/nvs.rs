//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the session configuration, stored as one
//! postcard blob.  On ESP-IDF it lives in the default NVS partition; the
//! simulation backend keeps the blob in memory.
//!
//! Every save is validated first.  A value that would wedge the lifecycle
//! (a zero retry ceiling, an empty broker host) is rejected, never clamped.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SessionConfig;
use log::info;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"gsmlink\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"session\0";
#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.  On a full or
    /// version-mismatched partition the flash is erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::StorageFailed);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::StorageFailed);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(None),
        })
    }

    /// Open the config namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// Reject configurations the lifecycle cannot run with.
pub fn validate_config(cfg: &SessionConfig) -> Result<(), ConfigError> {
    if cfg.broker_host.is_empty() {
        return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
    }
    if cfg.broker_port == 0 {
        return Err(ConfigError::ValidationFailed("broker_port must be non-zero"));
    }
    if cfg.client_id.is_empty() {
        return Err(ConfigError::ValidationFailed("client_id must not be empty"));
    }
    if cfg.publish_topic.is_empty() {
        return Err(ConfigError::ValidationFailed("publish_topic must not be empty"));
    }
    let quoted = [
        cfg.broker_host.as_str(),
        cfg.client_id.as_str(),
        cfg.publish_topic.as_str(),
        cfg.carrier_a.apn.as_str(),
        cfg.carrier_b.apn.as_str(),
    ];
    if quoted.iter().any(|s| s.contains('"')) {
        return Err(ConfigError::ValidationFailed(
            "quoted AT parameters must not contain '\"'",
        ));
    }

    let r = &cfg.retries;
    let ceilings = [
        r.module_probe,
        r.sim_probe,
        r.registration,
        r.mqtt_open,
        r.mqtt_connect,
        r.publish,
        r.lifecycle_errors,
    ];
    if ceilings.contains(&0) {
        return Err(ConfigError::ValidationFailed("retry ceilings must be at least 1"));
    }

    let t = &cfg.timing;
    if !(100..=5_000).contains(&t.settle_ms) {
        return Err(ConfigError::ValidationFailed("settle_ms must be 100–5000"));
    }
    if !(10..=1_000).contains(&t.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed("poll_interval_ms must be 10–1000"));
    }
    if t.mqtt_open_timeout_ms < t.poll_interval_ms || t.mqtt_connect_timeout_ms < t.poll_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "MQTT timeouts must exceed the poll interval",
        ));
    }
    if !(60..=86_400).contains(&t.deep_sleep_secs) {
        return Err(ConfigError::ValidationFailed("deep_sleep_secs must be 60–86400"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SessionConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.store.borrow().as_deref() {
                let cfg: SessionConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SessionConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size: usize = 0;
                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }
                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SessionConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SessionConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SessionConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SessionConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::StorageFailed)?;

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: config saved (simulation, {} bytes)", bytes.len());
            *self.store.borrow_mut() = Some(bytes);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::StorageFailed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixed;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&SessionConfig::default()).is_ok());
    }

    #[test]
    fn rejects_empty_broker_host() {
        let mut cfg = SessionConfig::default();
        cfg.broker_host = fixed("");
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_zero_retry_ceiling() {
        let mut cfg = SessionConfig::default();
        cfg.retries.publish = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_quote_in_topic() {
        let mut cfg = SessionConfig::default();
        cfg.publish_topic = fixed("a\"b");
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_out_of_range_settle() {
        let mut cfg = SessionConfig::default();
        cfg.timing.settle_ms = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn load_without_store_gives_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load().unwrap(), SessionConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SessionConfig::default();
        cfg.strict_provisioning = true;
        cfg.retries.registration = 20;
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn invalid_config_is_not_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SessionConfig::default();
        cfg.broker_port = 0;
        assert!(nvs.save(&cfg).is_err());
        assert_eq!(nvs.load().unwrap(), SessionConfig::default());
    }
}
