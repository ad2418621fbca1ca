//! `version` command.

/// Version line printed by `macaron version`.
pub fn version_line() -> String {
    format!("macaron-cli version {}", env!("CARGO_PKG_VERSION"))
}

/// Run the version command.
pub fn run() {
    println!("{}", version_line());
}
