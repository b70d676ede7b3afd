//! End-to-end aggregation run
//!
//! normalise grid -> select regions -> build mask -> compute weights -> aggregate -> tidy table

use log::info;
use regiomean_core::aggregate::Aggregator;
use regiomean_core::config::AggregationConfig;
use regiomean_core::diagnostics::{CoverageWarning, Diagnostics};
use regiomean_core::errors::RegiomeanResult;
use regiomean_core::grid::{GriddedDataset, RawDataset};
use regiomean_core::mask::RegionMaskBuilder;
use regiomean_core::region::{RegionCatalog, RegionDefinition};
use regiomean_core::tidy::{TidyAssembler, TidyTable};
use regiomean_core::weights::AreaWeights;

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub table: TidyTable,
    /// Regions left out of the table and why
    pub diagnostics: Diagnostics,
}

/// Run the whole chain on raw loader output
///
/// # Errors
///
/// Any input error from normalising the grid or validating the regions, an invalid
/// configuration, an overlap under [`OverlapPolicy::Reject`](regiomean_core::mask::OverlapPolicy::Reject),
/// or [`NoCoverage`](regiomean_core::errors::RegiomeanError::NoCoverage) when no
/// selected region contains a grid point.
pub fn run(
    raw: RawDataset,
    regions: Vec<RegionDefinition>,
    config: &AggregationConfig,
) -> RegiomeanResult<PipelineOutput> {
    config.validate()?;
    let dataset = GriddedDataset::from_raw(raw)?;
    let catalog = RegionCatalog::new(regions)?;
    run_with_catalog(&dataset, &catalog, config)
}

/// Run on an already-normalised dataset and validated catalog
///
/// The catalog is reduced to the configured region codes first; requested codes
/// missing from it are recorded as [`CoverageWarning::NotInCatalog`].
pub fn run_with_catalog(
    dataset: &GriddedDataset,
    catalog: &RegionCatalog,
    config: &AggregationConfig,
) -> RegiomeanResult<PipelineOutput> {
    config.validate()?;
    let mut diagnostics = Diagnostics::new();

    let (selected, missing) = catalog.select(config.region_codes.as_slice());
    info!("Found {} regions: {:?}", selected.len(), selected.codes());
    for code in missing {
        diagnostics.record(CoverageWarning::NotInCatalog { code });
    }

    let mask = RegionMaskBuilder::new()
        .with_overlap_policy(config.overlap_policy)
        .with_parallel(config.parallel)
        .build(dataset.latitude(), dataset.longitude(), &selected)?;
    let weights = AreaWeights::cos_latitude(dataset.latitude());

    let cube = Aggregator::new()
        .with_parallel(config.parallel)
        .aggregate(dataset, &selected, &mask, &weights, &mut diagnostics)?;

    let table = TidyAssembler::new(config.region_codes.as_slice()).assemble(&cube);

    Ok(PipelineOutput { table, diagnostics })
}
