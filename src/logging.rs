//! Logging shims
//!
//! - `defmt` feature: forwards to `defmt`
//! - Host unit tests: `println!`
//! - Otherwise: no-op

macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[TRACE] {}", format_args!($($arg)*));
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[DEBUG] {}", format_args!($($arg)*));
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[WARN] {}", format_args!($($arg)*));
    }};
}
