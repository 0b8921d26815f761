//! Provides a helper which computes a sliding average of a series of values.
//!
//! This is used to keep track of how long a [Group](crate::group::Group) waits for its origin
//! loader. An [Average] is internally mutable without needing a mutable reference as it only
//! relies on atomic operations.
//!
//! # Example
//!
//! ```
//! # use peercache::average::Average;
//! let avg = Average::new();
//! avg.add(10);
//! avg.add(20);
//! avg.add(30);
//!
//! assert_eq!(avg.avg(), 20);
//! assert_eq!(avg.count(), 3);
//! assert_eq!(avg.to_string(), "20 us (3)");
//! ```
use crate::fmt::format_micros;
use std::fmt;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximal number of values in the window before it is halved.
const WINDOW: i64 = 100;

/// Computes a sliding average of a series of values (usually durations in microseconds).
///
/// The window keeps the sum (upper 32 bits) and the number of values (lower 32 bits) in a single
/// atomic. Once the window is full or the sum would leave the range of an `i32`, both are halved,
/// so older values gradually lose their weight.
#[derive(Default)]
pub struct Average {
    window: AtomicU64,
    total: AtomicU64,
}

fn pack(sum: i64, count: i64) -> u64 {
    (u64::from(sum as u32) << 32) | u64::from(count as u32)
}

fn unpack(window: u64) -> (i64, i64) {
    (i64::from((window >> 32) as u32 as i32), i64::from(window as u32))
}

/// Halves the window until there is room for the given value.
fn make_room(mut sum: i64, mut count: i64, value: i64) -> (i64, i64) {
    while count > WINDOW || sum + value > i64::from(i32::MAX) {
        sum = count / 2 * sum / count;
        count /= 2;
    }

    (sum, count)
}

impl Average {
    /// Creates a new average.
    pub fn new() -> Average {
        Average::default()
    }

    /// Adds another value to the average.
    pub fn add(&self, value: i32) {
        let _ = self.total.fetch_add(1, Ordering::Relaxed);

        let value = i64::from(value);
        let _ = self
            .window
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |window| {
                let (sum, count) = unpack(window);
                let (sum, count) = make_room(sum, count, value);
                Some(pack(sum + value, count + 1))
            });
    }

    /// Returns the total number of recorded values.
    pub fn count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Computes the sliding average of the last values.
    pub fn avg(&self) -> i32 {
        let (sum, count) = unpack(self.window.load(Ordering::Relaxed));
        if count == 0 {
            0
        } else {
            (sum / count) as i32
        }
    }
}

impl Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_micros(self.avg(), f).and_then(|_| write!(f, " ({})", self.count()))
    }
}
