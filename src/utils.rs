use gdal_sys::{self, CPLErr};
use std::ffi::CStr;
use std::os::raw::c_char;

use crate::errors::Error;

pub fn _string(raw_ptr: *const c_char) -> String {
    if raw_ptr.is_null() {
        return String::new();
    }
    let c_str = unsafe { CStr::from_ptr(raw_ptr) };
    c_str.to_string_lossy().into_owned()
}

pub fn _last_cpl_err(cpl_err_class: CPLErr::Type) -> Error {
    let last_err_no = unsafe { gdal_sys::CPLGetLastErrorNo() };
    let last_err_msg = _string(unsafe { gdal_sys::CPLGetLastErrorMsg() });
    unsafe { gdal_sys::CPLErrorReset() };
    Error::CplError {
        class: cpl_err_class,
        number: last_err_no,
        msg: last_err_msg,
    }
}

/// Turn the return code of a raw GDAL call into a `Result`.
pub fn _check_rc(rv: CPLErr::Type) -> crate::errors::Result<()> {
    if rv != CPLErr::CE_None {
        return Err(_last_cpl_err(rv));
    }
    Ok(())
}
