// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

// Forward to tracing on host builds, compile to nothing on the target.

#[cfg(feature = "trace")]
macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "trace"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "trace")]
macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "trace"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
