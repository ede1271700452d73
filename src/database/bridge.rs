use duckdb::core::FlatVector;
use duckdb::vtab::Value;
use libduckdb_sys::duckdb_free;
use libduckdb_sys::duckdb_get_bool;
use libduckdb_sys::duckdb_get_uint32;
use libduckdb_sys::duckdb_get_varchar;
use libduckdb_sys::duckdb_value;
use std::ffi::CStr;
use std::os::raw::c_void;

/// Reads parameter values through the C API, which the safe `Value` wrapper does not expose
pub(crate) trait ValueBridge {
    /// Gets the raw pointer to the underlying DuckDB value
    fn get_value_ptr(&self) -> duckdb_value;

    fn to_bool(&self) -> bool {
        unsafe { duckdb_get_bool(self.get_value_ptr()) }
    }

    fn to_uint32(&self) -> u32 {
        unsafe { duckdb_get_uint32(self.get_value_ptr()) }
    }

    /// Converts the value to an owned UTF-8 string, freeing the C string
    fn to_varchar(&self) -> String {
        unsafe {
            let varchar = duckdb_get_varchar(self.get_value_ptr());
            let c_str = CStr::from_ptr(varchar);
            let string = c_str.to_string_lossy().into_owned();
            duckdb_free(varchar as *mut c_void);
            string
        }
    }
}

impl ValueBridge for Value {
    /// # DANGER: Highly unstable memory layout hack
    ///
    /// Assumes that `Value` is a plain wrapper around a single `duckdb_value` field.
    /// A change of the wrapper in a duckdb-rs release breaks this silently.
    fn get_value_ptr(&self) -> duckdb_value {
        unsafe { *(self as *const Value as *const duckdb_value) }
    }
}

/// Writes a nullable BIGINT into a flat vector
pub(crate) fn write_bigint(vector: &mut FlatVector, row: usize, value: Option<i64>) {
    match value {
        Some(value) => {
            unsafe {
                let pointer: *mut i64 = vector.as_mut_ptr();
                std::ptr::write(pointer.add(row), value);
            }
        }
        None => vector.set_null(row),
    }
}
