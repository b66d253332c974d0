//! Small time helpers shared by every subsystem that stamps timestamps into
//! SQL rows or JWT claims.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds.
pub fn now_secs() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock before 1970")
		.as_secs() as i64
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> u128 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock before 1970")
		.as_millis()
}
