// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Utility macros for MessageLane.

/// Times the execution of a block and invokes a callback with the label and elapsed duration.
///
/// In **release builds** the timing is eliminated and only the block executes.
///
/// ```ignore
/// let result = timed!("my_operation", |label, dur: Duration| {
///     eprintln!("[{label}] took {dur:?}");
/// }, {
///     42
/// });
/// assert_eq!(result, 42);
/// ```
#[cfg(all(debug_assertions, any(test, feature = "log")))]
macro_rules! timed {
    ($label:expr, $callback:expr, $block:expr) => {{
        let __timed_start = ::std::time::Instant::now();
        let __timed_result = $block;
        ($callback)($label, __timed_start.elapsed());
        __timed_result
    }};
}

#[cfg(all(not(debug_assertions), test))]
macro_rules! timed {
    ($label:expr, $callback:expr, $block:expr) => {
        $block
    };
}

/// Times a block and reports the elapsed duration at `trace` level.
///
/// Compiles to the bare block in release builds or without the `log` feature.
#[cfg(all(debug_assertions, feature = "log"))]
macro_rules! timed_trace {
    ($label:expr, $block:expr) => {
        $crate::utils::timed!(
            $label,
            |label, elapsed: ::std::time::Duration| {
                $crate::log::trace!("[messagelane] {}: {:?}", label, elapsed)
            },
            $block
        )
    };
}

#[cfg(not(all(debug_assertions, feature = "log")))]
macro_rules! timed_trace {
    ($label:expr, $block:expr) => {
        $block
    };
}

#[cfg(any(test, all(debug_assertions, feature = "log")))]
pub(crate) use timed;
pub(crate) use timed_trace;
