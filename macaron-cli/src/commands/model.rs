//! `model` command: print the detected model identifier.

use macaron::model::platform_detector;

use crate::error::CliError;

/// Run the model command.
///
/// Detection failure is reported, not treated as an error.
pub fn run() -> Result<(), CliError> {
    match platform_detector().detect() {
        Some(model) => println!("current model is {}", model),
        None => println!("current model is unknown."),
    }
    Ok(())
}
