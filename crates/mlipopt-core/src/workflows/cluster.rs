use super::plain_float;
use crate::core::calculator::traits::CalculatorFactory;
use crate::core::crest::{self, CrestConfig, CrestSurvivor, EV_TO_KCAL_PER_MOL};
use crate::core::geometry::calculate_rmsd;
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use crate::engine::config::OptimizerConfig;
use crate::engine::error::EngineError;
use crate::engine::optimizer;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::OptimizationOutcome;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument, warn};

/// One row of the per-conformer report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformerSummary {
    /// 1-based position in the input ensemble.
    pub conformer: usize,
    /// Optimized energy, eV.
    pub energy: Option<f64>,
    pub converged: bool,
    pub steps: usize,
    /// Coordinate RMSD between input and optimized geometry, Å.
    pub rmsd: Option<f64>,
    /// Whether CREST kept this conformer.
    pub kept: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Unique conformers, lowest energy first, titled and annotated.
    pub survivors: Vec<Molecule>,
    pub summaries: Vec<ConformerSummary>,
}

impl ClusterResult {
    pub fn failed(&self) -> usize {
        self.summaries.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Optimizes every conformer, then lets CREST discard duplicates and high-energy structures.
///
/// The ensemble is split into one contiguous batch per rayon thread and each batch gets its
/// own calculator from `factory`. Conformers whose optimization fails are reported and left
/// out; the run fails only if none succeed.
#[instrument(skip_all, name = "cluster_workflow")]
pub fn run(
    conformers: &[Molecule],
    state: &ElectronicState,
    optimizer_config: &OptimizerConfig,
    crest_config: &CrestConfig,
    factory: &dyn CalculatorFactory,
    reporter: &ProgressReporter,
) -> Result<ClusterResult, EngineError> {
    if conformers.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    // === Phase 1: Optimize every conformer ===
    reporter.report(Progress::PhaseStart {
        name: "Optimizing conformers",
    });
    reporter.report(Progress::TaskStart {
        total_steps: conformers.len() as u64,
    });
    // Every calculator is a worker process with its own copy of the model: at most one per thread.
    let workers = rayon::current_num_threads().clamp(1, conformers.len());
    let chunk_size = conformers.len().div_ceil(workers);
    info!(
        "Optimizing {} conformers with {} calculator workers",
        conformers.len(),
        conformers.len().div_ceil(chunk_size)
    );

    let outcomes: Vec<Result<OptimizationOutcome, EngineError>> = conformers
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(chunk, batch)| {
            let mut calculator = factory.create().map_err(|e| e.to_string());
            batch
                .iter()
                .enumerate()
                .map(|(offset, conformer)| {
                    let index = chunk * chunk_size + offset;
                    let result = match &mut calculator {
                        Ok(calculator) => optimizer::optimize(
                            conformer,
                            state,
                            None,
                            optimizer_config,
                            calculator.as_mut(),
                            &ProgressReporter::new(),
                        ),
                        Err(message) => Err(EngineError::WorkerUnavailable(message.clone())),
                    };
                    if let Err(e) = &result {
                        warn!("Skipping conformer {}: {}", index + 1, e);
                        reporter.report(Progress::Message(format!(
                            "conformer {} skipped: {}",
                            index + 1,
                            e
                        )));
                    }
                    reporter.report(Progress::TaskIncrement);
                    result
                })
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut summaries: Vec<ConformerSummary> = outcomes
        .iter()
        .zip(conformers)
        .enumerate()
        .map(|(index, (outcome, input))| summarize(index, input, outcome))
        .collect();

    let optimized: Vec<(usize, &OptimizationOutcome)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(index, outcome)| outcome.as_ref().ok().map(|o| (index, o)))
        .collect();
    if optimized.is_empty() {
        return Err(EngineError::AllConformersFailed {
            count: conformers.len(),
        });
    }
    if optimized.len() < conformers.len() {
        warn!(
            "{} of {} conformers failed and are excluded from clustering",
            conformers.len() - optimized.len(),
            conformers.len()
        );
    }

    // === Phase 2: CREGEN sorting ===
    reporter.report(Progress::PhaseStart {
        name: "Clustering with CREST",
    });
    let ensemble: Vec<(&Molecule, f64)> = optimized
        .iter()
        .map(|(_, outcome)| (&outcome.molecule, outcome.energy))
        .collect();
    let kept = crest::cregen(&ensemble, state, crest_config)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Annotate survivors ===
    let lowest = kept.first().map_or(0.0, |s| s.energy);
    let mut survivors = Vec::with_capacity(kept.len());
    for survivor in kept {
        let origin = match_origin(&survivor, &optimized);
        if let Some(index) = origin {
            summaries[index].kept = true;
        }
        survivors.push(annotate(survivor, origin, lowest, state));
    }

    info!(
        "CREST kept {} of {} optimized conformers",
        survivors.len(),
        optimized.len()
    );
    Ok(ClusterResult {
        survivors,
        summaries,
    })
}

/// Writes the per-conformer report as CSV.
pub fn write_summary(path: &Path, summaries: &[ConformerSummary]) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in summaries {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn summarize(
    index: usize,
    input: &Molecule,
    outcome: &Result<OptimizationOutcome, EngineError>,
) -> ConformerSummary {
    match outcome {
        Ok(outcome) => ConformerSummary {
            conformer: index + 1,
            energy: Some(outcome.energy),
            converged: outcome.converged,
            steps: outcome.steps,
            rmsd: calculate_rmsd(&input.positions(), &outcome.molecule.positions()),
            kept: false,
            error: None,
        },
        Err(e) => ConformerSummary {
            conformer: index + 1,
            energy: None,
            converged: false,
            steps: 0,
            rmsd: None,
            kept: false,
            error: Some(e.to_string()),
        },
    }
}

/// Index of the optimized conformer geometrically closest to `survivor`.
fn match_origin(
    survivor: &CrestSurvivor,
    optimized: &[(usize, &OptimizationOutcome)],
) -> Option<usize> {
    let positions = survivor.molecule.positions();
    optimized
        .iter()
        .filter_map(|(index, outcome)| {
            calculate_rmsd(&positions, &outcome.molecule.positions()).map(|rmsd| (*index, rmsd))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

fn annotate(
    survivor: CrestSurvivor,
    origin: Option<usize>,
    lowest: f64,
    state: &ElectronicState,
) -> Molecule {
    let mut molecule = survivor.molecule;
    let rel_energy = (survivor.energy - lowest) * EV_TO_KCAL_PER_MOL;
    let props = &mut molecule.properties;
    props.clear();
    if let Some(index) = origin {
        props.insert("conformer".to_string(), (index + 1).to_string());
    }
    props.insert("energy".to_string(), format!("{:.6}", survivor.energy));
    props.insert("rel_energy".to_string(), format!("{:.2}", rel_energy));
    props.insert("charge".to_string(), plain_float(state.charge));
    props.insert("spin".to_string(), plain_float(state.spin));

    let prefix = origin.map_or_else(String::new, |i| format!("conformer={} ", i + 1));
    molecule.title = format!(
        "{}energy={:.6} eV rel_energy={:.2} kcal/mol charge={} spin={}",
        prefix,
        survivor.energy,
        rel_energy,
        plain_float(state.charge),
        plain_float(state.spin)
    );
    molecule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::testing::DiatomicFactory;
    use crate::core::models::element::Element;
    use nalgebra::Point3;
    use std::sync::atomic::Ordering;

    fn diatomic(distance: f64, offset: f64) -> Molecule {
        let h = Element::from_symbol("H").unwrap();
        let mut mol = Molecule::new("conformer");
        mol.add_atom(h, Point3::new(offset, 0.0, 0.0));
        mol.add_atom(h, Point3::new(offset + distance, 0.0, 0.0));
        mol
    }

    fn triatomic() -> Molecule {
        let h = Element::from_symbol("H").unwrap();
        let mut mol = Molecule::new("wrong size");
        for x in 0..3 {
            mol.add_atom(h, Point3::new(x as f64, 0.0, 0.0));
        }
        mol
    }

    fn outcome(energy: f64, molecule: Molecule) -> OptimizationOutcome {
        OptimizationOutcome {
            molecule,
            energy,
            steps: 4,
            converged: true,
            fmax: 0.01,
        }
    }

    #[test]
    fn survivors_are_matched_by_geometry() {
        let a = outcome(-1.0, diatomic(0.74, 0.0));
        let b = outcome(-2.0, diatomic(0.74, 3.0));
        let optimized = vec![(0, &a), (2, &b)];
        let survivor = CrestSurvivor {
            molecule: diatomic(0.74, 3.0),
            energy: -2.0,
        };
        assert_eq!(match_origin(&survivor, &optimized), Some(2));
    }

    #[test]
    fn annotation_reports_relative_energy() {
        let survivor = CrestSurvivor {
            molecule: diatomic(0.74, 0.0),
            energy: -0.9,
        };
        let molecule = annotate(survivor, Some(4), -1.0, &ElectronicState::new(1.0, 2.0));
        assert_eq!(molecule.properties["conformer"], "5");
        assert_eq!(molecule.properties["rel_energy"], "2.31");
        assert_eq!(
            molecule.title,
            "conformer=5 energy=-0.900000 eV rel_energy=2.31 kcal/mol charge=1.0 spin=2.0"
        );
    }

    #[test]
    fn failed_conformers_are_summarized_with_their_error() {
        let input = diatomic(1.0, 0.0);
        let row = summarize(
            1,
            &input,
            &Err(EngineError::WorkerUnavailable("no worker".to_string())),
        );
        assert_eq!(row.conformer, 2);
        assert!(row.energy.is_none());
        assert!(row.error.unwrap().contains("no worker"));
    }

    #[test]
    fn summary_is_written_as_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let rows = vec![
            ConformerSummary {
                conformer: 1,
                energy: Some(-1.5),
                converged: true,
                steps: 7,
                rmsd: Some(0.25),
                kept: true,
                error: None,
            },
            ConformerSummary {
                conformer: 2,
                energy: None,
                converged: false,
                steps: 0,
                rmsd: None,
                kept: false,
                error: Some("boom".to_string()),
            },
        ];
        write_summary(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "conformer,energy,converged,steps,rmsd,kept,error");
        assert_eq!(lines[1], "1,-1.5,true,7,0.25,true,");
        assert_eq!(lines[2], "2,,false,0,,false,boom");
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        let factory = DiatomicFactory::new(20.0, 0.74);
        let result = run(
            &[],
            &ElectronicState::default(),
            &OptimizerConfig::default(),
            &CrestConfig::default(),
            &factory,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::EmptyInput)));
    }

    #[test]
    fn all_failures_abort_before_clustering() {
        let factory = DiatomicFactory::new(20.0, 0.74);
        let result = run(
            &[triatomic(), triatomic()],
            &ElectronicState::default(),
            &OptimizerConfig::default(),
            &CrestConfig {
                command: "/nonexistent/crest".to_string(),
                ..CrestConfig::default()
            },
            &factory,
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::AllConformersFailed { count: 2 })
        ));
        assert!(factory.created.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn calculators_are_limited_to_one_per_thread() {
        let factory = DiatomicFactory::new(20.0, 0.74);
        let conformers: Vec<Molecule> = (0..64)
            .map(|i| diatomic(0.6 + 0.01 * i as f64, 2.0 * i as f64))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap();
        let result = pool.install(|| {
            run(
                &conformers,
                &ElectronicState::default(),
                &OptimizerConfig::default(),
                &CrestConfig {
                    command: "/nonexistent/crest".to_string(),
                    ..CrestConfig::default()
                },
                &factory,
                &ProgressReporter::new(),
            )
        });

        assert!(matches!(result, Err(EngineError::Crest(_))));
        let created = factory.created.load(Ordering::SeqCst);
        assert!((1..=2).contains(&created), "created {created} calculators");
    }

    #[cfg(unix)]
    #[test]
    fn ensemble_is_optimized_and_clustered() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("crest");
        // Keep only the first frame (four lines for a diatomic).
        std::fs::write(&script, "#!/bin/sh\nhead -n 4 \"$1\" > crest_ensemble.xyz\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let factory = DiatomicFactory::new(20.0, 0.74);
        let conformers = vec![diatomic(1.0, 0.0), triatomic(), diatomic(0.6, 5.0)];
        let crest_config = CrestConfig {
            command: script.display().to_string(),
            ..CrestConfig::default()
        };
        // Two threads split the three conformers into batches [1, 2] and [3].
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap();
        let result = pool
            .install(|| {
                run(
                    &conformers,
                    &ElectronicState::default(),
                    &OptimizerConfig::default(),
                    &crest_config,
                    &factory,
                    &ProgressReporter::new(),
                )
            })
            .unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(result.survivors.len(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.summaries.len(), 3);
        assert!(result.summaries[0].kept);
        assert!(!result.summaries[2].kept);
        assert!(result.summaries[1].error.is_some());
        assert!(result.summaries[0].error.is_none() && result.summaries[2].error.is_none());
        assert!(result.summaries[0].rmsd.unwrap() > 0.0);

        let survivor = &result.survivors[0];
        assert_eq!(survivor.properties["conformer"], "1");
        assert_eq!(survivor.properties["rel_energy"], "0.00");
        assert!(survivor.title.starts_with("conformer=1 energy="));
    }
}
