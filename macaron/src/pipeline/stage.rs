//! Pipeline stages for progress reporting.

use std::fmt;

/// Progress callback invoked on every stage entry.
///
/// # Arguments
///
/// * `stage` - Stage being entered
/// * `message` - Human-readable message
pub type StageCallback = Box<dyn Fn(PipelineStage, &str) + Send + Sync>;

/// Stages of a retrieval run, in execution order.
///
/// `Aborted` is terminal and can follow any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    /// Nothing has happened yet.
    Idle,
    /// A model identifier is known.
    ModelResolved,
    /// The catalog has been fetched to disk.
    CatalogFetched,
    /// The catalog has been parsed into records.
    Parsed,
    /// A package has been chosen.
    Selected,
    /// The package is being downloaded.
    Downloading,
    /// The package is being unpacked.
    Extracting,
    /// The working directory is being removed.
    CleaningUp,
    /// The run completed.
    Done,
    /// The run failed.
    Aborted,
}

impl PipelineStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ModelResolved => "Model resolved",
            Self::CatalogFetched => "Catalog fetched",
            Self::Parsed => "Parsed",
            Self::Selected => "Selected",
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
            Self::CleaningUp => "Cleaning up",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        }
    }

    /// Whether no further stage can follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_name() {
        assert_eq!(PipelineStage::ModelResolved.name(), "Model resolved");
        assert_eq!(PipelineStage::CleaningUp.name(), "Cleaning up");
        assert_eq!(PipelineStage::Aborted.to_string(), "Aborted");
    }

    #[test]
    fn test_stage_order() {
        assert!(PipelineStage::Idle < PipelineStage::ModelResolved);
        assert!(PipelineStage::Downloading < PipelineStage::Extracting);
        assert!(PipelineStage::CleaningUp < PipelineStage::Done);
    }

    #[test]
    fn test_terminal_stages() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Aborted.is_terminal());
        assert!(!PipelineStage::Selected.is_terminal());
    }
}
