use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint};
use libloading::Library;
use log::trace;
use once_cell::sync::OnceCell;
use crate::drivers::multimeter::ScpiLink;
use crate::drivers::InstrumentError;
type ViSession = c_uint;
type ViStatus = c_int;
const VI_SUCCESS: ViStatus = 0;
const VI_SUCCESS_MAX_CNT: ViStatus = 0x3FFF_0006;
const VI_NULL: c_uint = 0;
const OPEN_TIMEOUT_MS: c_uint = 2_000;
const READ_CHUNK: usize = 1024;
const DESC_LEN: usize = 256;
const FIND_ALL_INSTR: &[u8] = b"?*INSTR\0";
#[cfg(target_os = "windows")]
const LIBRARY_CANDIDATES: &[&str] = &["visa64.dll", "visa32.dll"];
#[cfg(target_os = "macos")]
const LIBRARY_CANDIDATES: &[&str] = &["/Library/Frameworks/VISA.framework/VISA", "libvisa.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_CANDIDATES: &[&str] = &["libvisa.so", "libvisa.so.0", "librsvisa.so", "libiovisa.so"];
struct VisaApi {
    #[allow(dead_code)]
    lib: Library,
    open_default_rm: unsafe extern "C" fn(*mut ViSession) -> ViStatus,
    find_rsrc: unsafe extern "C" fn(
        ViSession,
        *const c_char,
        *mut ViSession,
        *mut c_uint,
        *mut c_char,
    ) -> ViStatus,
    find_next: unsafe extern "C" fn(ViSession, *mut c_char) -> ViStatus,
    open: unsafe extern "C" fn(ViSession, *const c_char, c_uint, c_uint, *mut ViSession) -> ViStatus,
    close: unsafe extern "C" fn(ViSession) -> ViStatus,
    write: unsafe extern "C" fn(ViSession, *const u8, c_uint, *mut c_uint) -> ViStatus,
    read: unsafe extern "C" fn(ViSession, *mut u8, c_uint, *mut c_uint) -> ViStatus,
}
impl VisaApi {
    fn load() -> Result<Self, InstrumentError> {
        let mut last_err = String::from("no candidate library names");
        for name in LIBRARY_CANDIDATES {
            match unsafe { Library::new(name) } {
                Ok(lib) => return Self::bind(lib),
                Err(e) => last_err = format!("{name}: {e}"),
            }
        }
        Err(InstrumentError::Library(last_err))
    }
    fn bind(lib: Library) -> Result<Self, InstrumentError> {
        let missing = |e: libloading::Error| InstrumentError::Library(e.to_string());
        // Safety: signatures follow the VPP-4.3.2 VISA C API.
        unsafe {
            Ok(Self {
                open_default_rm: *lib.get(b"viOpenDefaultRM\0").map_err(missing)?,
                find_rsrc: *lib.get(b"viFindRsrc\0").map_err(missing)?,
                find_next: *lib.get(b"viFindNext\0").map_err(missing)?,
                open: *lib.get(b"viOpen\0").map_err(missing)?,
                close: *lib.get(b"viClose\0").map_err(missing)?,
                write: *lib.get(b"viWrite\0").map_err(missing)?,
                read: *lib.get(b"viRead\0").map_err(missing)?,
                lib,
            })
        }
    }
    fn instance() -> Result<&'static VisaApi, InstrumentError> {
        static API: OnceCell<VisaApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }
    fn check(status: ViStatus, operation: &'static str) -> Result<ViStatus, InstrumentError> {
        if status < VI_SUCCESS {
            Err(InstrumentError::Visa { operation, status })
        } else {
            Ok(status)
        }
    }
    fn default_rm(&self) -> Result<ViSession, InstrumentError> {
        let mut rm: ViSession = 0;
        Self::check(
            unsafe { (self.open_default_rm)(&mut rm as *mut ViSession) },
            "viOpenDefaultRM",
        )?;
        Ok(rm)
    }
}
fn desc_to_string(desc: &[c_char; DESC_LEN]) -> String {
    unsafe { CStr::from_ptr(desc.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
/// Session with one VISA instrument. Messages are `\n` terminated.
pub struct VisaLink {
    api: &'static VisaApi,
    rm: ViSession,
    session: ViSession,
    resource: String,
}
impl VisaLink {
    pub fn open(resource: &str) -> Result<Self, InstrumentError> {
        // rejected before any VISA handle exists
        let name = CString::new(resource)
            .map_err(|_| InstrumentError::UnsupportedResource(resource.to_owned()))?;
        let api = VisaApi::instance()?;
        let rm = api.default_rm()?;
        let mut session: ViSession = 0;
        let status = unsafe {
            (api.open)(
                rm,
                name.as_ptr(),
                VI_NULL,
                OPEN_TIMEOUT_MS,
                &mut session as *mut ViSession,
            )
        };
        if status < VI_SUCCESS {
            unsafe { (api.close)(rm) };
            return Err(InstrumentError::Open {
                resource: resource.to_owned(),
                reason: format!("viOpen status {status:#x}"),
            });
        }
        Ok(Self {
            api,
            rm,
            session,
            resource: resource.to_owned(),
        })
    }
    /// Every `INSTR` resource the VISA installation can see.
    pub fn list_resources() -> Result<Vec<String>, InstrumentError> {
        let api = VisaApi::instance()?;
        let rm = api.default_rm()?;
        let mut list: ViSession = 0;
        let mut count: c_uint = 0;
        let mut desc = [0 as c_char; DESC_LEN];
        let status = unsafe {
            (api.find_rsrc)(
                rm,
                FIND_ALL_INSTR.as_ptr() as *const c_char,
                &mut list as *mut ViSession,
                &mut count as *mut c_uint,
                desc.as_mut_ptr(),
            )
        };
        let mut found = Vec::new();
        // nothing found is reported as an error status
        if status >= VI_SUCCESS {
            found.push(desc_to_string(&desc));
            for _ in 1..count {
                if unsafe { (api.find_next)(list, desc.as_mut_ptr()) } < VI_SUCCESS {
                    break;
                }
                found.push(desc_to_string(&desc));
            }
            unsafe { (api.close)(list) };
        }
        unsafe { (api.close)(rm) };
        Ok(found)
    }
    fn read_reply(&mut self) -> Result<String, InstrumentError> {
        let mut reply = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let mut got: c_uint = 0;
            let status = VisaApi::check(
                unsafe {
                    (self.api.read)(
                        self.session,
                        chunk.as_mut_ptr(),
                        READ_CHUNK as c_uint,
                        &mut got as *mut c_uint,
                    )
                },
                "viRead",
            )?;
            reply.extend_from_slice(&chunk[..got as usize]);
            if status != VI_SUCCESS_MAX_CNT {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
impl ScpiLink for VisaLink {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        trace!("Sending command to {}: '{}'", self.resource, command);
        let line = format!("{command}\n");
        let mut sent: c_uint = 0;
        VisaApi::check(
            unsafe {
                (self.api.write)(
                    self.session,
                    line.as_ptr(),
                    line.len() as c_uint,
                    &mut sent as *mut c_uint,
                )
            },
            "viWrite",
        )?;
        Ok(())
    }
    fn query(&mut self, command: &str) -> Result<String, InstrumentError> {
        self.write(command)?;
        let reply = self.read_reply()?;
        trace!(
            "Received response from {}: '{}'",
            self.resource,
            reply.escape_default()
        );
        Ok(reply)
    }
}
impl Drop for VisaLink {
    fn drop(&mut self) {
        unsafe {
            (self.api.close)(self.session);
            (self.api.close)(self.rm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_nul_is_rejected_without_touching_visa() {
        let err = VisaLink::open("USB0::0x0957\0::INSTR").err().unwrap();
        assert!(matches!(err, InstrumentError::UnsupportedResource(ref r) if r.contains("0x0957")));
    }

    #[test]
    fn descriptor_stops_at_nul() {
        let mut desc = [0 as c_char; DESC_LEN];
        for (slot, byte) in desc.iter_mut().zip(b"ASRL3::INSTR") {
            *slot = *byte as c_char;
        }
        assert_eq!(desc_to_string(&desc), "ASRL3::INSTR");
    }
}
