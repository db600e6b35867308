//! Raw access to DuckDB parameter values.
use duckdb::vtab::Value;
use libduckdb_sys::duckdb_free;
use libduckdb_sys::duckdb_get_double;
use libduckdb_sys::duckdb_get_list_child;
use libduckdb_sys::duckdb_get_list_size;
use libduckdb_sys::duckdb_get_map_key;
use libduckdb_sys::duckdb_get_map_size;
use libduckdb_sys::duckdb_get_map_value;
use libduckdb_sys::duckdb_get_varchar;
use libduckdb_sys::duckdb_value;
use std::ffi::CStr;
use std::os::raw::c_void;

/// Conversions `Value` does not offer for the parameter types used here
/// (DOUBLE, VARCHAR[] and MAP).
pub(crate) trait ValueBridge {
    /// Extracts the raw `duckdb_value` pointer wrapped by the `Value`.
    ///
    /// # Safety
    ///
    /// Relies on `Value` being a plain wrapper around a single `duckdb_value`.
    /// This holds for the pinned duckdb-rs version and must be rechecked on upgrade.
    unsafe fn get_value_ptr(&self) -> duckdb_value;

    fn to_double(&self) -> f64 {
        unsafe { duckdb_get_double(self.get_value_ptr()) }
    }

    fn to_varchar(&self) -> String {
        unsafe {
            let varchar = duckdb_get_varchar(self.get_value_ptr());
            let string = CStr::from_ptr(varchar).to_string_lossy().into_owned();
            duckdb_free(varchar as *mut c_void);
            string
        }
    }

    fn to_list(&self) -> Vec<Value> {
        unsafe {
            let size = duckdb_get_list_size(self.get_value_ptr());
            (0..size)
                .map(|index| Value::from(duckdb_get_list_child(self.get_value_ptr(), index)))
                .collect()
        }
    }

    /// Map entries as (key, value) pairs
    fn to_map_entries(&self) -> Vec<(Value, Value)> {
        unsafe {
            let size = duckdb_get_map_size(self.get_value_ptr());
            (0..size)
                .map(|index| {
                    (
                        Value::from(duckdb_get_map_key(self.get_value_ptr(), index)),
                        Value::from(duckdb_get_map_value(self.get_value_ptr(), index)),
                    )
                })
                .collect()
        }
    }
}

impl ValueBridge for Value {
    unsafe fn get_value_ptr(&self) -> duckdb_value {
        *(self as *const Value as *const duckdb_value)
    }
}
