//! Global tracing subscriber installation, mirroring the teacher's
//! `tracing_subscriber::fmt()` + `EnvFilter` setup in `garage/main.rs`.

use tracing_subscriber::filter::EnvFilter;

use crate::config::LogFormat;

pub fn init(format: LogFormat, default_filter: &str) {
	if std::env::var("RUST_LOG").is_err() {
		std::env::set_var("RUST_LOG", default_filter);
	}
	let filter = EnvFilter::from_default_env();

	let builder = tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter);

	match format {
		LogFormat::Pretty => builder.init(),
		LogFormat::Json => builder.json().init(),
	}
}
