//! Shared helpers for the scenario tests below, in the style of the `common`
//! module other integration-test suites in this tree keep: finding a free
//! port, checking whether an external engine binary is on `PATH`, and a
//! scratch directory that cleans itself up.

use std::net::TcpListener;
use std::path::PathBuf;

pub fn free_port() -> u16 {
	TcpListener::bind("127.0.0.1:0")
		.expect("binding an ephemeral port")
		.local_addr()
		.unwrap()
		.port()
}

pub fn binary_on_path(name: &str) -> bool {
	std::env::var_os("PATH")
		.map(|paths| {
			std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
		})
		.unwrap_or(false)
}

pub struct ScratchDir(pub PathBuf);

impl ScratchDir {
	pub fn new(label: &str) -> Self {
		let dir = std::env::temp_dir().join(format!(
			"node-integration-{}-{}-{}",
			label,
			std::process::id(),
			free_port()
		));
		std::fs::create_dir_all(&dir).expect("creating scratch dir");
		ScratchDir(dir)
	}
}

impl Drop for ScratchDir {
	fn drop(&mut self) {
		let _ = std::fs::remove_dir_all(&self.0);
	}
}
