//! Windows Registry startup registration.
//!
//! Launch at login is a `REG_SZ` value under the per-user `Run` key holding
//! the executable path.

use super::{PreferencesError, StartupRegistration};
use windows::core::PCWSTR;
use windows::Win32::System::Registry::{
    RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_SZ,
};

/// Registry-based startup registration.
pub struct RegistryStartup {
    run_key_path: Vec<u16>,
    value_name: Vec<u16>,
}

impl RegistryStartup {
    const RUN_KEY: &'static str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const APP_NAME: &'static str = "MicMaster";

    pub fn new() -> Self {
        Self {
            run_key_path: Self::to_wide(Self::RUN_KEY),
            value_name: Self::to_wide(Self::APP_NAME),
        }
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }
}

impl Default for RegistryStartup {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupRegistration for RegistryStartup {
    fn is_enabled(&self) -> Result<bool, PreferencesError> {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.run_key_path.as_ptr()),
                0,
                KEY_READ,
                &mut hkey,
            );

            if result.is_err() {
                return Ok(false);
            }

            let mut data_size = 0u32;
            let result = RegQueryValueExW(
                hkey,
                PCWSTR::from_raw(self.value_name.as_ptr()),
                None,
                None,
                None,
                Some(&mut data_size),
            );

            let _ = RegCloseKey(hkey);

            Ok(result.is_ok() && data_size > 0)
        }
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError> {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.run_key_path.as_ptr()),
                0,
                KEY_WRITE,
                &mut hkey,
            );

            if result.is_err() {
                return Err(PreferencesError::RegistryAccess(
                    "Failed to open Run key".to_string(),
                ));
            }

            let result = if enabled {
                let exe_path = match std::env::current_exe() {
                    Ok(path) => path,
                    Err(_) => {
                        let _ = RegCloseKey(hkey);
                        return Err(PreferencesError::WriteFailed {
                            key: Self::APP_NAME.to_string(),
                        });
                    }
                };
                let exe_path_wide = Self::to_wide(&exe_path.to_string_lossy());

                RegSetValueExW(
                    hkey,
                    PCWSTR::from_raw(self.value_name.as_ptr()),
                    0,
                    REG_SZ,
                    Some(std::slice::from_raw_parts(
                        exe_path_wide.as_ptr() as *const u8,
                        exe_path_wide.len() * 2,
                    )),
                )
            } else {
                RegDeleteValueW(hkey, PCWSTR::from_raw(self.value_name.as_ptr()))
            };

            let _ = RegCloseKey(hkey);

            // Deleting a value that was never written is fine.
            if result.is_err() && enabled {
                Err(PreferencesError::WriteFailed {
                    key: Self::APP_NAME.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}
