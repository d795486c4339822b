//! History-based transport loop.
//!
//! The manager samples one history at a time from the source, transports
//! every particle of that history (secondaries included) through the
//! geometry and commits the estimator scores before the next history starts.
//! Histories are independent and run in parallel on a rayon pool.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{Error, LostParticle, Result};
use crate::sim::estimator::RunStatistics;
use crate::sim::framework::{
    Collision, Geometry, HistoryRng, SimulationContext, Source, SurfaceHit, history_rng,
};
use crate::sim::particle::{Bank, HistoryNumber, ParticleBank, ParticleState};
use crate::sim::properties::SimulationProperties;

#[derive(Debug, Clone, Copy)]
pub struct SimulationProgress {
    /// Histories finished in the current run.
    pub histories_done: u64,
    /// Histories requested for the current run (may stop early).
    pub histories_requested: u64,
    /// Lost particles since the manager was created.
    pub lost_particles: u64,
    /// Wall-clock time of the current run (seconds).
    pub elapsed_s: f64,
}

trait ProgressReporter: Sync {
    fn every_histories(&self) -> u64;
    fn report(&self, progress: &SimulationProgress);
}

struct NoProgress;
impl ProgressReporter for NoProgress {
    fn every_histories(&self) -> u64 {
        0
    }
    fn report(&self, _progress: &SimulationProgress) {}
}

struct LogProgress {
    every_histories: u64,
}
impl ProgressReporter for LogProgress {
    fn every_histories(&self) -> u64 {
        self.every_histories
    }
    fn report(&self, progress: &SimulationProgress) {
        log::info!(
            "{}/{} histories, {} lost, {:.1} s",
            progress.histories_done,
            progress.histories_requested,
            progress.lost_particles,
            progress.elapsed_s
        );
    }
}

// Workers report concurrently, so the callback sits behind a lock
struct FnProgress<F> {
    every_histories: u64,
    f: Mutex<F>,
}
impl<F> ProgressReporter for FnProgress<F>
where
    F: FnMut(&SimulationProgress) + Send,
{
    fn every_histories(&self) -> u64 {
        self.every_histories
    }
    fn report(&self, progress: &SimulationProgress) {
        (self.f.lock())(progress);
    }
}

/// Drives histories through geometry, collision physics and estimators.
pub struct SimulationManager<'a> {
    context: &'a SimulationContext,
    geometry: &'a dyn Geometry,
    collision: &'a dyn Collision,
    source: &'a dyn Source,
    properties: SimulationProperties,
    next_history: HistoryNumber,
    histories_completed: AtomicU64,
    lost_particles: AtomicU64,
    discarded_source_particles: AtomicU64,
    end_simulation: Arc<AtomicBool>,
    elapsed_time: f64,
}

impl<'a> SimulationManager<'a> {
    /// Creates a manager. Invalid properties abort here, before any history.
    pub fn new(
        context: &'a SimulationContext,
        geometry: &'a dyn Geometry,
        collision: &'a dyn Collision,
        source: &'a dyn Source,
        properties: SimulationProperties,
    ) -> Result<Self> {
        properties
            .validate()
            .map_err(|e| Error::InvalidParam(format!("{e:#}")))?;
        Ok(Self {
            context,
            geometry,
            collision,
            source,
            next_history: properties.start_history,
            properties,
            histories_completed: AtomicU64::new(0),
            lost_particles: AtomicU64::new(0),
            discarded_source_particles: AtomicU64::new(0),
            end_simulation: Arc::new(AtomicBool::new(false)),
            elapsed_time: 0.,
        })
    }

    pub fn properties(&self) -> &SimulationProperties {
        &self.properties
    }

    pub fn histories_completed(&self) -> u64 {
        self.histories_completed.load(Ordering::Relaxed)
    }

    pub fn lost_particles(&self) -> u64 {
        self.lost_particles.load(Ordering::Relaxed)
    }

    /// Source particles that could not be located in the geometry.
    pub fn discarded_source_particles(&self) -> u64 {
        self.discarded_source_particles.load(Ordering::Relaxed)
    }

    /// Accumulated wall-clock time of all runs (seconds).
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Number of the next history to be simulated.
    pub fn next_history(&self) -> HistoryNumber {
        self.next_history
    }

    pub fn run_statistics(&self) -> RunStatistics {
        RunStatistics::new(self.histories_completed(), self.elapsed_time)
    }

    /// Flag that stops the current run when set.
    ///
    /// Workers finish the history they are on; histories not yet started
    /// are skipped.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.end_simulation)
    }

    /// Runs `properties.number_of_histories` histories.
    pub fn run(&mut self) -> Result<()> {
        self.run_simulation(self.properties.number_of_histories)
    }

    /// Runs `history_count` histories, continuing the history numbering of
    /// previous runs.
    pub fn run_simulation(&mut self, history_count: u64) -> Result<()> {
        let interval = self.properties.progress_interval;
        if interval > 0 {
            self.run_with_reporter(
                history_count,
                LogProgress {
                    every_histories: interval,
                },
            )
        } else {
            self.run_with_reporter(history_count, NoProgress)
        }
    }

    /// Runs `history_count` histories while periodically reporting progress.
    ///
    /// - `every_histories=0` disables progress reporting.
    /// - The reporter is called from worker threads, one call at a time.
    pub fn run_simulation_with_progress<F>(
        &mut self,
        history_count: u64,
        every_histories: u64,
        report: F,
    ) -> Result<()>
    where
        F: FnMut(&SimulationProgress) + Send,
    {
        let reporter = FnProgress {
            every_histories,
            f: Mutex::new(report),
        };
        self.run_with_reporter(history_count, reporter)
    }

    fn run_with_reporter<R: ProgressReporter>(
        &mut self,
        history_count: u64,
        reporter: R,
    ) -> Result<()> {
        let num_threads = self.properties.number_of_threads;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        self.context.estimators().enable_thread_support(num_threads);
        self.end_simulation.store(false, Ordering::Relaxed);

        let first = self.next_history;
        let last = first + history_count;
        log::info!(
            "Running histories {first}..{last} on {num_threads} thread(s): \
             geometry={}, collision={}, source={}",
            self.geometry.name(),
            self.collision.name(),
            self.source.name()
        );

        let start = Instant::now();
        let done_in_run = AtomicU64::new(0);
        let report_every = reporter.every_histories();
        {
            let this = &*self;
            pool.install(|| {
                (first..last)
                    .into_par_iter()
                    .for_each_init(ParticleBank::new, |bank, history| {
                        if this.end_simulation.load(Ordering::Relaxed) {
                            return;
                        }
                        this.simulate_history(history, bank);

                        let done = done_in_run.fetch_add(1, Ordering::Relaxed) + 1;
                        if report_every > 0 && done.is_multiple_of(report_every) {
                            reporter.report(&SimulationProgress {
                                histories_done: done,
                                histories_requested: history_count,
                                lost_particles: this.lost_particles(),
                                elapsed_s: start.elapsed().as_secs_f64(),
                            });
                        }
                    });
            });
        }
        let elapsed = start.elapsed().as_secs_f64();
        self.elapsed_time += elapsed;
        self.next_history = last;

        let done = done_in_run.load(Ordering::Relaxed);
        if done < history_count {
            log::info!("Simulation stopped after {done} of {history_count} histories");
        }
        log::info!(
            "Finished {done} histories in {elapsed:.3} s ({} lost particles)",
            self.lost_particles()
        );
        Ok(())
    }

    /// Simulates a single history using `bank` as the worker's particle bank.
    ///
    /// All particles the history produces are transported (or set aside by
    /// the bank) and the estimator scores are committed before returning.
    pub fn simulate_history<B: Bank>(&self, history: HistoryNumber, bank: &mut B) {
        let mut rng = history_rng(self.properties.seed, history);

        let mut source_bank = ParticleBank::new();
        self.source
            .sample_particle_state(&mut source_bank, history, &mut rng);
        while let Some(mut particle) = source_bank.pop() {
            match self.geometry.find_cell_containing_point(&particle.ray()) {
                Ok(cell) => {
                    particle.set_cell(cell);
                    self.context
                        .registry()
                        .dispatch_particle_generation_event(&particle, cell);
                    bank.push(particle);
                }
                Err(lost) => {
                    log::warn!(
                        "History {history}: source particle at {} discarded ({lost})",
                        particle.position()
                    );
                    self.discarded_source_particles
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        while let Some(mut particle) = bank.pop() {
            self.simulate_particle(&mut particle, bank, &mut rng);
        }

        self.context.commit_history_contributions();
        self.histories_completed.fetch_add(1, Ordering::Relaxed);
    }

    fn simulate_particle<B: Bank>(
        &self,
        particle: &mut ParticleState,
        bank: &mut B,
        rng: &mut HistoryRng,
    ) {
        if self.geometry.is_termination_cell(particle.cell()) {
            particle.set_as_gone();
            return;
        }

        while particle.is_active() {
            if particle.energy() < self.properties.min_energy(particle.particle_type()) {
                particle.set_as_gone();
                break;
            }
            let optical_path = self.collision.sample_optical_path_length(rng);
            self.simulate_particle_track(particle, bank, optical_path, rng);
        }
    }

    /// Tracks the particle until it collides, leaves the problem or is lost.
    fn simulate_particle_track<B: Bank>(
        &self,
        particle: &mut ParticleState,
        bank: &mut B,
        optical_path: f64,
        rng: &mut HistoryRng,
    ) {
        let mut remaining = optical_path;

        loop {
            let cell = particle.cell();
            let hit = match self.geometry.fire_ray(&particle.ray(), cell) {
                Ok(hit) => hit,
                Err(lost) => {
                    self.handle_lost_particle(particle, &lost);
                    return;
                }
            };

            let sigma = if self.collision.is_cell_void(cell) {
                0.
            } else {
                self.collision.macroscopic_total_cross_section(particle)
            };
            let op_to_surface = hit.distance * sigma;

            if sigma == 0. || op_to_surface < remaining {
                if let Err(lost) = self.advance_particle_to_cell_boundary(particle, hit) {
                    self.handle_lost_particle(particle, &lost);
                    return;
                }
                if self.geometry.is_termination_cell(particle.cell()) {
                    particle.set_as_gone();
                    return;
                }
                remaining -= op_to_surface;
            } else {
                let distance = remaining / sigma;
                particle.advance(distance);

                let registry = self.context.registry();
                registry.dispatch_particle_subtrack_ending_in_cell_event(particle, cell, distance);
                registry.dispatch_particle_colliding_in_cell_event(particle, cell, 1. / sigma);

                self.geometry.new_ray();
                self.collision.collide_with_cell_material(
                    particle,
                    bank,
                    self.properties.analogue_collisions,
                    rng,
                );
                return;
            }
        }
    }

    fn advance_particle_to_cell_boundary(
        &self,
        particle: &mut ParticleState,
        hit: SurfaceHit,
    ) -> std::result::Result<(), LostParticle> {
        if !hit.distance.is_finite() {
            return Err(LostParticle::new(format!(
                "no bounding surface ahead in void cell {}",
                particle.cell()
            )));
        }

        let cell = particle.cell();
        particle.advance(hit.distance);

        let registry = self.context.registry();
        registry.dispatch_particle_subtrack_ending_in_cell_event(particle, cell, hit.distance);
        registry.dispatch_particle_leaving_cell_event(particle, cell);

        let normal = self
            .geometry
            .surface_normal(hit.surface, particle.position())?;
        let angle_cosine = particle.direction().dot(normal);
        registry.dispatch_particle_crossing_surface_event(particle, hit.surface, angle_cosine);

        let next_cell = self.geometry.find_cell_containing_point(&particle.ray())?;
        particle.set_cell(next_cell);
        registry.dispatch_particle_entering_cell_event(particle, next_cell);
        Ok(())
    }

    fn handle_lost_particle(&self, particle: &mut ParticleState, lost: &LostParticle) {
        log::warn!(
            "History {}: {lost} (cell {}, position {}, direction {})",
            particle.history_number(),
            particle.cell(),
            particle.position(),
            particle.direction()
        );
        particle.set_as_lost();
        self.lost_particles.fetch_add(1, Ordering::Relaxed);
    }

    /// Writes run counters, the source summary and every estimator summary.
    pub fn print_simulation_summary(&self, os: &mut dyn Write) -> Result<()> {
        writeln!(os, "Number of histories completed: {}", self.histories_completed())?;
        writeln!(os, "Lost particles: {}", self.lost_particles())?;
        writeln!(
            os,
            "Discarded source particles: {}",
            self.discarded_source_particles()
        )?;
        writeln!(os, "Simulation Time (s): {:.3}", self.elapsed_time)?;
        writeln!(os)?;
        self.source.print_summary(os)?;
        writeln!(os)?;
        self.context
            .estimators()
            .print_summaries(os, &self.run_statistics())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::Vector;
    use crate::geom::ray::Ray;
    use crate::geom::slab::SlabModel;
    use crate::sim::estimator::{
        CellTrackLengthFluxEstimator, ContributionMultiplier, Estimator, EventSubscriber,
        SurfaceCurrentEstimator,
    };
    use crate::sim::event::DispatchRegistry;
    use crate::sim::particle::{EntityId, ParticleType, ReactionTag};
    use std::sync::atomic::AtomicUsize;

    /// Void everywhere.
    struct Void;
    impl Collision for Void {
        fn name(&self) -> &'static str {
            "void"
        }
        fn is_cell_void(&self, _cell: EntityId) -> bool {
            true
        }
        fn macroscopic_total_cross_section(&self, _particle: &ParticleState) -> f64 {
            0.
        }
        fn macroscopic_reaction_cross_section(
            &self,
            _particle: &ParticleState,
            _reaction: ReactionTag,
        ) -> f64 {
            0.
        }
        fn collide_with_cell_material(
            &self,
            _particle: &mut ParticleState,
            _bank: &mut dyn Bank,
            _analogue: bool,
            _rng: &mut HistoryRng,
        ) {
        }
    }

    /// Dense material whose collisions drop the energy below every cutoff.
    struct Quench;
    impl Collision for Quench {
        fn name(&self) -> &'static str {
            "quench"
        }
        fn is_cell_void(&self, _cell: EntityId) -> bool {
            false
        }
        fn macroscopic_total_cross_section(&self, _particle: &ParticleState) -> f64 {
            1e6
        }
        fn macroscopic_reaction_cross_section(
            &self,
            _particle: &ParticleState,
            _reaction: ReactionTag,
        ) -> f64 {
            0.
        }
        fn collide_with_cell_material(
            &self,
            particle: &mut ParticleState,
            _bank: &mut dyn Bank,
            _analogue: bool,
            _rng: &mut HistoryRng,
        ) {
            particle.increment_collision_number();
            particle.set_energy(1e-20);
        }
    }

    /// Emits one particle per history from a fixed point.
    struct Beam {
        position: Point,
        direction: Vector,
    }

    fn beam(x: f64) -> Beam {
        Beam {
            position: Point::new(x, 0., 0.),
            direction: Vector::new(1., 0., 0.),
        }
    }
    impl Source for Beam {
        fn name(&self) -> &'static str {
            "beam"
        }
        fn sample_particle_state(
            &self,
            bank: &mut dyn Bank,
            history: HistoryNumber,
            _rng: &mut HistoryRng,
        ) {
            let mut p = ParticleState::new(history, ParticleType::Neutron);
            p.set_position(self.position);
            p.set_direction(self.direction);
            p.set_energy(1.);
            bank.push(p);
        }
        fn sampling_efficiency(&self) -> f64 {
            1.
        }
    }

    /// Slab geometry that cannot find its exit surfaces.
    struct Broken(SlabModel);
    impl Geometry for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn find_cell_containing_point(
            &self,
            ray: &Ray,
        ) -> std::result::Result<EntityId, LostParticle> {
            self.0.find_cell_containing_point(ray)
        }
        fn fire_ray(
            &self,
            _ray: &Ray,
            _cell: EntityId,
        ) -> std::result::Result<SurfaceHit, LostParticle> {
            Err(LostParticle::new("ray escaped the model"))
        }
        fn surface_normal(
            &self,
            surface: EntityId,
            point: Point,
        ) -> std::result::Result<Vector, LostParticle> {
            self.0.surface_normal(surface, point)
        }
        fn is_termination_cell(&self, cell: EntityId) -> bool {
            self.0.is_termination_cell(cell)
        }
    }

    /// Counts commits; attaches to nothing.
    struct CommitCounter {
        commits: AtomicUsize,
    }
    impl Estimator for CommitCounter {
        fn id(&self) -> u32 {
            99
        }
        fn has_uncommitted_history_contribution(&self) -> bool {
            false
        }
        fn commit_history_contribution(&self) {
            self.commits.fetch_add(1, Ordering::Relaxed);
        }
        fn enable_thread_support(&self, _num_threads: usize) {}
        fn reset_data(&self) {}
        fn print_summary(
            &self,
            _os: &mut dyn Write,
            _stats: &RunStatistics,
        ) -> std::io::Result<()> {
            Ok(())
        }
    }
    impl EventSubscriber for CommitCounter {
        fn subscribe(self: Arc<Self>, _registry: &mut DispatchRegistry) {}
    }

    fn slabs() -> SlabModel {
        SlabModel::from_planes(vec![0., 1., 3.]).unwrap()
    }

    fn properties(histories: u64, threads: usize) -> SimulationProperties {
        SimulationProperties {
            number_of_histories: histories,
            number_of_threads: threads,
            ..SimulationProperties::default()
        }
    }

    #[test]
    fn test_streaming_through_void_slabs() {
        let geometry = slabs();
        let source = beam(0.5);
        let mut ctx = SimulationContext::new();
        let flux = Arc::new(
            CellTrackLengthFluxEstimator::new(
                0,
                1.,
                &[(1, geometry.cell_thickness(1).unwrap()), (2, 2.)],
            )
            .unwrap(),
        );
        let current = Arc::new(SurfaceCurrentEstimator::new(1, 1., &[2, 3]).unwrap());
        ctx.add_estimator(flux.clone()).unwrap();
        ctx.add_estimator(current.clone()).unwrap();

        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(10, 1)).unwrap();
        manager.run().unwrap();

        assert_eq!(manager.histories_completed(), 10);
        assert_eq!(manager.lost_particles(), 0);
        assert_eq!(manager.next_history(), 10);

        // 0.5 cm in cell 1 (volume 1), 2 cm in cell 2 (volume 2)
        let stats = manager.run_statistics();
        let cell1 = flux.base().processed_entity_total(1, &stats).unwrap()[0];
        let cell2 = flux.base().processed_entity_total(2, &stats).unwrap()[0];
        assert!((cell1.mean - 0.5).abs() < 1e-12);
        assert!((cell2.mean - 1.).abs() < 1e-12);
        assert!(cell1.relative_error.abs() < 1e-12);

        let total = current.base().total_moments()[0];
        assert!((total.first - 20.).abs() < 1e-12);
    }

    #[test]
    fn test_source_outside_geometry_is_discarded() {
        let geometry = slabs();
        // On plane x = 3 moving outwards: located in the termination cell
        let outside = beam(3.);
        let ctx = SimulationContext::new();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &outside, properties(3, 1)).unwrap();
        manager.run().unwrap();
        assert_eq!(manager.histories_completed(), 3);
        assert_eq!(manager.lost_particles(), 0);

        // On a plane and parallel to it: cannot be located
        let nowhere = Beam {
            position: Point::new(1., 0., 0.),
            direction: Vector::new(0., 1., 0.),
        };
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &nowhere, properties(3, 1)).unwrap();
        manager.run().unwrap();
        assert_eq!(manager.histories_completed(), 3);
        assert_eq!(manager.discarded_source_particles(), 3);
        assert_eq!(manager.lost_particles(), 0);
    }

    #[test]
    fn test_fire_ray_failure_loses_particle_and_continues() {
        let geometry = Broken(slabs());
        let source = beam(0.5);
        let ctx = SimulationContext::new();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(5, 2)).unwrap();
        manager.run().unwrap();
        assert_eq!(manager.histories_completed(), 5);
        assert_eq!(manager.lost_particles(), 5);
    }

    #[test]
    fn test_energy_cutoff_after_collision() {
        let geometry = slabs();
        let source = beam(0.5);
        let mut ctx = SimulationContext::new();
        let collision_flux = Arc::new(
            crate::sim::estimator::CellCollisionFluxEstimator::new(0, 1., &[(1, 1.)])
                .unwrap()
                .with_contribution_multiplier(ContributionMultiplier::Weight),
        );
        ctx.add_estimator(collision_flux.clone()).unwrap();
        let manager =
            SimulationManager::new(&ctx, &geometry, &Quench, &source, properties(1, 1)).unwrap();

        let mut bank = ParticleBank::new();
        manager.simulate_history(0, &mut bank);
        assert!(bank.is_empty());
        assert_eq!(manager.histories_completed(), 1);
        assert_eq!(manager.lost_particles(), 0);

        // One collision scoring 1/sigma
        let m = collision_flux.base().total_moments()[0];
        assert!((m.first - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_commit_once_per_history() {
        let geometry = slabs();
        let source = beam(0.5);
        let mut ctx = SimulationContext::new();
        let counter = Arc::new(CommitCounter {
            commits: AtomicUsize::new(0),
        });
        ctx.add_estimator(counter.clone()).unwrap();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Quench, &source, properties(37, 3)).unwrap();
        manager.run().unwrap();
        assert_eq!(counter.commits.load(Ordering::Relaxed), 37);
    }

    #[test]
    fn test_stop_flag_skips_remaining_histories() {
        let geometry = slabs();
        let source = beam(0.5);
        let ctx = SimulationContext::new();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(100, 1)).unwrap();
        let stop = manager.stop_handle();
        manager
            .run_simulation_with_progress(100, 10, |progress| {
                if progress.histories_done == 20 {
                    stop.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(manager.histories_completed(), 20);
        // Numbering continues after the requested range
        assert_eq!(manager.next_history(), 100);
    }

    #[test]
    fn test_progress_reporter_is_called() {
        let geometry = slabs();
        let source = beam(0.5);
        let ctx = SimulationContext::new();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(12, 2)).unwrap();
        let mut calls = Vec::new();
        manager
            .run_simulation_with_progress(12, 4, |p| calls.push(p.histories_done))
            .unwrap();
        calls.sort_unstable();
        assert_eq!(calls, vec![4, 8, 12]);
    }

    #[test]
    fn test_invalid_properties_abort_setup() {
        let geometry = slabs();
        let source = beam(0.5);
        let ctx = SimulationContext::new();
        let result = SimulationManager::new(&ctx, &geometry, &Void, &source, properties(1, 0));
        assert!(matches!(result, Err(Error::InvalidParam(_))));
    }

    #[test]
    fn test_summary_mentions_histories_and_time() {
        let geometry = slabs();
        let source = beam(0.5);
        let mut ctx = SimulationContext::new();
        ctx.add_estimator(Arc::new(
            SurfaceCurrentEstimator::new(4, 1., &[3]).unwrap(),
        ))
        .unwrap();
        let mut manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(4, 1)).unwrap();
        manager.run().unwrap();

        let mut out = Vec::new();
        manager.print_simulation_summary(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Number of histories completed: 4"));
        assert!(text.contains("Simulation Time (s)"));
        assert!(text.contains("beam"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_summary_write_failure_is_io_error() {
        let geometry = slabs();
        let source = beam(0.5);
        let ctx = SimulationContext::new();
        let manager =
            SimulationManager::new(&ctx, &geometry, &Void, &source, properties(1, 1)).unwrap();
        let result = manager.print_simulation_summary(&mut ClosedPipe);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
