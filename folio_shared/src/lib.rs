mod event_queue;
mod indexing_container;

pub use event_queue::*;
pub use indexing_container::*;

pub use byte_unit;
pub use chrono;
pub use crossbeam_channel;
pub use log;
pub use num_cpus;
pub use parking_lot;
pub use pathdiff;
pub use serde;
pub use serde_yaml;
pub use thiserror;
pub use walkdir;

/// Name of the function this macro is called in
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - 3]
    }};
}

/// Formats a byte count for log output, e.g. `"195.3 KiB"`.
pub fn format_bytes(bytes: u64) -> String {
    let adjusted = byte_unit::Byte::from_u64(bytes).get_appropriate_unit(byte_unit::UnitType::Binary);
    format!("{adjusted:.1}")
}
