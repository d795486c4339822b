use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use transport3d::sim::collision::MaterialCollisionHandler;
use transport3d::sim::estimator::{
    CellCollisionFluxEstimator, CellPulseHeightEstimator, CellTrackLengthFluxEstimator,
    EnergyResponse, ParticleResponse, PhaseSpaceDimension, SurfaceCurrentEstimator,
    SurfaceFluxEstimator, UnitResponse,
};
use transport3d::sim::materials::MaterialLibrary;
use transport3d::sim::source::{EmissionDirection, PointSource};
use transport3d::{
    ParticleType, Point, SimulationContext, SimulationManager, SimulationProperties, SlabModel,
    Vector,
};

/// 14.1 MeV neutrons from a D-T source on the face of a
/// water / iron / lead shield, 10 cm each.
fn main() -> Result<()> {
    env_logger::init();

    let properties = match std::env::args().nth(1) {
        Some(path) => SimulationProperties::from_toml_file(Path::new(&path))?,
        None => SimulationProperties {
            number_of_histories: 10_000,
            number_of_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            progress_interval: 2_000,
            ..SimulationProperties::default()
        },
    };

    let geometry = SlabModel::from_planes(vec![0., 10., 20., 30.])?;
    let mut materials = MaterialLibrary::with_presets();
    for (cell, material) in [(1, 1), (2, 2), (3, 3)] {
        materials.assign(cell, material)?;
    }
    let collision = MaterialCollisionHandler::new(materials);

    let source = PointSource::new(Point::new(0., 0., 0.), ParticleType::Neutron, 14.1)?
        .with_direction(EmissionDirection::Cone {
            axis: Vector::new(1., 0., 0.),
            min_cosine: 0.,
        })?;

    let energy_bins = vec![1e-11, 1e-6, 0.1, 1., 10., 15.];
    let cell_volumes = geometry.cell_volumes();
    let surfaces = &geometry.surface_ids()[1..];
    let surface_areas: Vec<_> = surfaces.iter().map(|&s| (s, 1.)).collect();

    // Flux and energy flux (MeV/cm^2) from the same tracks
    let energy_flux = EnergyResponse::new("energy flux", vec![0., 15.], vec![0., 15.])?;
    let responses: Vec<Arc<dyn ParticleResponse>> =
        vec![Arc::new(UnitResponse), Arc::new(energy_flux)];

    let mut context = SimulationContext::new();
    context.add_estimator(Arc::new(
        CellTrackLengthFluxEstimator::new(1, 1., &cell_volumes)?
            .with_bins(PhaseSpaceDimension::Energy, energy_bins.clone())?
            .with_response_functions(responses)?,
    ))?;
    context.add_estimator(Arc::new(CellCollisionFluxEstimator::new(
        2,
        1.,
        &cell_volumes,
    )?))?;
    context.add_estimator(Arc::new(
        SurfaceCurrentEstimator::new(3, 1., surfaces)?
            .with_bins(PhaseSpaceDimension::Cosine, vec![-1., 0., 1.])?,
    ))?;
    context.add_estimator(Arc::new(
        SurfaceFluxEstimator::new(4, 1., &surface_areas)?
            .with_cosine_cutoff(properties.surface_flux_angle_cosine_cutoff)?
            .with_bins(PhaseSpaceDimension::Energy, energy_bins)?,
    ))?;
    context.add_estimator(Arc::new(
        CellPulseHeightEstimator::new(5, 1., geometry.cell_ids())?
            .with_energy_bins(vec![0., 1e-3, 1., 5., 15.])?,
    ))?;

    let mut manager =
        SimulationManager::new(&context, &geometry, &collision, &source, properties)?;
    manager.run().context("simulation failed")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    manager.print_simulation_summary(&mut out)?;
    out.flush()?;
    Ok(())
}
