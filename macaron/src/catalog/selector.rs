//! Package selection by model.

use crate::model::ModelIdentifier;

use super::record::DriverPackageRecord;

/// Records supporting `model`, in catalog order.
pub fn select_packages<'a>(
    records: &'a [DriverPackageRecord],
    model: &ModelIdentifier,
) -> Vec<&'a DriverPackageRecord> {
    records.iter().filter(|r| r.supports(model)).collect()
}

/// The package the pipeline uses for `model`: the first match.
///
/// No version comparison is made; with several matches the one listed first
/// in the catalog wins, which is not necessarily the newest.
pub fn first_package<'a>(
    records: &'a [DriverPackageRecord],
    model: &ModelIdentifier,
) -> Option<&'a DriverPackageRecord> {
    records.iter().find(|r| r.supports(model))
}
