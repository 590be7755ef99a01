#![allow(non_snake_case)]

//! Live shell-link backend: `IShellLinkW`/`IShellLinkA` plus `IPersistFile`
//! through hand-rolled COM vtables (windows-sys exposes no COM wrappers).

use std::ffi::c_void;
use std::ptr;

use windows_sys::core::GUID;
use windows_sys::Win32::Foundation::MAX_PATH;
use windows_sys::Win32::Globalization::{MultiByteToWideChar, CP_ACP};
use windows_sys::Win32::Storage::FileSystem::{
    GetLongPathNameW, WIN32_FIND_DATAA, WIN32_FIND_DATAW,
};
use windows_sys::Win32::System::Com::{
    CoCreateInstance, CoInitialize, CoUninitialize, CLSCTX_INPROC_SERVER,
};

use super::{from_wstring, to_wstring};
use crate::engine::service::{HResult, InterfaceVariant, LinkSession, ShellLinkService, UiContext};

// --- GUID Definitions ---
const CLSID_SHELL_LINK: GUID = GUID { data1: 0x00021401, data2: 0x0000, data3: 0x0000, data4: [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46] };
const IID_ISHELL_LINK_W: GUID = GUID { data1: 0x000214F9, data2: 0x0000, data3: 0x0000, data4: [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46] };
const IID_ISHELL_LINK_A: GUID = GUID { data1: 0x000214EE, data2: 0x0000, data3: 0x0000, data4: [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46] };
const IID_IPERSIST_FILE: GUID = GUID { data1: 0x0000010b, data2: 0x0000, data3: 0x0000, data4: [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46] };

const SLR_NO_UI: u32 = 0x0001;
const SLGP_SHORTPATH: u32 = 0x0001;
const STGM_READ: u32 = 0x0000_0000;

// --- VTable Definitions ---
// Only the slots the resolver calls are typed; everything between GetPath
// and Resolve is padded to keep the layout correct.

#[repr(C)]
struct IUnknownVtbl {
    QueryInterface: unsafe extern "system" fn(*mut c_void, *const GUID, *mut *mut c_void) -> HResult,
    AddRef: unsafe extern "system" fn(*mut c_void) -> u32,
    Release: unsafe extern "system" fn(*mut c_void) -> u32,
}

#[repr(C)]
struct IShellLinkWVtbl {
    QueryInterface: unsafe extern "system" fn(*mut c_void, *const GUID, *mut *mut c_void) -> HResult,
    AddRef: unsafe extern "system" fn(*mut c_void) -> u32,
    Release: unsafe extern "system" fn(*mut c_void) -> u32,
    GetPath: unsafe extern "system" fn(*mut c_void, *mut u16, i32, *mut WIN32_FIND_DATAW, u32) -> HResult,
    // GetIDList through SetRelativePath, unused here.
    _unused: [*const c_void; 15],
    Resolve: unsafe extern "system" fn(*mut c_void, *mut c_void, u32) -> HResult,
}

#[repr(C)]
struct IShellLinkAVtbl {
    QueryInterface: unsafe extern "system" fn(*mut c_void, *const GUID, *mut *mut c_void) -> HResult,
    AddRef: unsafe extern "system" fn(*mut c_void) -> u32,
    Release: unsafe extern "system" fn(*mut c_void) -> u32,
    GetPath: unsafe extern "system" fn(*mut c_void, *mut u8, i32, *mut WIN32_FIND_DATAA, u32) -> HResult,
    _unused: [*const c_void; 15],
    Resolve: unsafe extern "system" fn(*mut c_void, *mut c_void, u32) -> HResult,
}

#[repr(C)]
struct IPersistFileVtbl {
    QueryInterface: unsafe extern "system" fn(*mut c_void, *const GUID, *mut *mut c_void) -> HResult,
    AddRef: unsafe extern "system" fn(*mut c_void) -> u32,
    Release: unsafe extern "system" fn(*mut c_void) -> u32,
    GetClassID: unsafe extern "system" fn(*mut c_void, *mut GUID) -> HResult, // IPersist
    IsDirty: unsafe extern "system" fn(*mut c_void) -> HResult,
    Load: unsafe extern "system" fn(*mut c_void, *const u16, u32) -> HResult,
}

// COM object pointers are pointers to a vtable pointer.
unsafe fn vtbl<'a, T>(obj: *mut c_void) -> &'a T {
    unsafe { &**(obj as *mut *mut T) }
}

unsafe fn release(obj: *mut c_void) {
    if !obj.is_null() {
        unsafe {
            (vtbl::<IUnknownVtbl>(obj).Release)(obj);
        }
    }
}

fn succeeded(hr: HResult) -> bool {
    hr >= 0
}

/// Shell-link resolution backed by the live COM shell service.
pub struct ComShellLinkService;

impl ShellLinkService for ComShellLinkService {
    fn initialize(&self) -> Result<(), HResult> {
        // S_FALSE (already initialized on this thread) also counts as up.
        let hr = unsafe { CoInitialize(ptr::null_mut()) };
        if succeeded(hr) {
            Ok(())
        } else {
            Err(hr)
        }
    }

    fn uninitialize(&self) {
        unsafe { CoUninitialize() };
    }

    fn acquire(&self, variant: InterfaceVariant) -> Result<Box<dyn LinkSession + '_>, HResult> {
        let iid = match variant {
            InterfaceVariant::Wide => &IID_ISHELL_LINK_W,
            InterfaceVariant::Narrow => &IID_ISHELL_LINK_A,
        };
        let mut link: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            CoCreateInstance(
                &CLSID_SHELL_LINK,
                ptr::null_mut(),
                CLSCTX_INPROC_SERVER,
                iid,
                &mut link,
            )
        };
        if !succeeded(hr) {
            return Err(hr);
        }
        Ok(Box::new(ComSession {
            kind: variant,
            link,
            persist: ptr::null_mut(),
        }))
    }

    fn expand_long_path(&self, short_path: &str) -> Option<String> {
        let wide = to_wstring(short_path);
        let mut buf = vec![0u16; MAX_PATH as usize];
        let mut len = unsafe { GetLongPathNameW(wide.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
        if len as usize > buf.len() {
            // First call reported the required size.
            buf = vec![0u16; len as usize];
            len = unsafe { GetLongPathNameW(wide.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
        }
        if len == 0 || len as usize > buf.len() {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len as usize]))
    }
}

/// One resolution attempt over either interface variant. The variant only
/// matters for `GetPath`, whose character type differs; loading always goes
/// through `IPersistFile`, which takes a wide path in both cases.
struct ComSession {
    kind: InterfaceVariant,
    link: *mut c_void,
    persist: *mut c_void,
}

impl LinkSession for ComSession {
    fn acquire_persist(&mut self) -> Result<(), HResult> {
        let mut persist: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            (vtbl::<IUnknownVtbl>(self.link).QueryInterface)(
                self.link,
                &IID_IPERSIST_FILE,
                &mut persist,
            )
        };
        if !succeeded(hr) {
            return Err(hr);
        }
        self.persist = persist;
        Ok(())
    }

    fn load(&mut self, link_path: &str) -> Result<(), HResult> {
        let wide = to_wstring(link_path);
        let hr = unsafe {
            (vtbl::<IPersistFileVtbl>(self.persist).Load)(self.persist, wide.as_ptr(), STGM_READ)
        };
        if succeeded(hr) {
            Ok(())
        } else {
            Err(hr)
        }
    }

    fn resolve(&mut self, ui: Option<UiContext>) -> Result<(), HResult> {
        let hwnd = ui.map_or(ptr::null_mut(), |u| u.hwnd as *mut c_void);
        let flags = if ui.is_some() { 0 } else { SLR_NO_UI };
        let hr = match self.kind {
            InterfaceVariant::Wide => unsafe {
                (vtbl::<IShellLinkWVtbl>(self.link).Resolve)(self.link, hwnd, flags)
            },
            InterfaceVariant::Narrow => unsafe {
                (vtbl::<IShellLinkAVtbl>(self.link).Resolve)(self.link, hwnd, flags)
            },
        };
        if succeeded(hr) {
            Ok(())
        } else {
            Err(hr)
        }
    }

    fn target_path(&mut self) -> Result<String, HResult> {
        match self.kind {
            InterfaceVariant::Wide => {
                let mut buf = [0u16; MAX_PATH as usize];
                let mut fd: WIN32_FIND_DATAW = unsafe { std::mem::zeroed() };
                let hr = unsafe {
                    (vtbl::<IShellLinkWVtbl>(self.link).GetPath)(
                        self.link,
                        buf.as_mut_ptr(),
                        buf.len() as i32,
                        &mut fd,
                        SLGP_SHORTPATH,
                    )
                };
                if !succeeded(hr) {
                    return Err(hr);
                }
                Ok(from_wstring(&buf))
            }
            InterfaceVariant::Narrow => {
                let mut buf = [0u8; MAX_PATH as usize];
                let mut fd: WIN32_FIND_DATAA = unsafe { std::mem::zeroed() };
                let hr = unsafe {
                    (vtbl::<IShellLinkAVtbl>(self.link).GetPath)(
                        self.link,
                        buf.as_mut_ptr(),
                        buf.len() as i32,
                        &mut fd,
                        SLGP_SHORTPATH,
                    )
                };
                if !succeeded(hr) {
                    return Err(hr);
                }
                Ok(ansi_to_string(&buf))
            }
        }
    }
}

impl Drop for ComSession {
    fn drop(&mut self) {
        unsafe {
            release(self.persist);
            release(self.link);
        }
    }
}

/// Decode a null-terminated buffer in the active ANSI code page.
fn ansi_to_string(buf: &[u8]) -> String {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    if len == 0 {
        return String::new();
    }
    let mut wide = vec![0u16; len];
    let written = unsafe {
        MultiByteToWideChar(
            CP_ACP,
            0,
            buf.as_ptr(),
            len as i32,
            wide.as_mut_ptr(),
            wide.len() as i32,
        )
    };
    if written <= 0 {
        // Unconvertible buffer; keep the raw bytes rather than drop the path.
        return String::from_utf8_lossy(&buf[..len]).into_owned();
    }
    String::from_utf16_lossy(&wide[..written as usize])
}
