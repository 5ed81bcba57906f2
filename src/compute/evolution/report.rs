//! Reporting of evolution progress and artifacts.
//!
//! The chamber hands every report to a [`Reporter`] and never looks at the
//! outcome. [`LogReporter`] writes to the `log` facade, [`JsonReporter`]
//! additionally persists truss views and statistics series as pretty JSON.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::compute::geometry::Vec2;
use crate::compute::graph::{AxisFlags, BoundingBox, Graph};
use crate::compute::solver::TrussSolution;
use crate::schema::{EvolutionProgress, EvolutionResult, HistorySummary, StatPoint};

/// How a truss view should be drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Keep x and y on the same scale.
    pub proportional: bool,
    /// Fixed frame; computed from the graph when absent.
    pub frame: Option<BoundingBox>,
    /// Displacement scale for deformed views.
    pub deformation_factor: Option<f64>,
    /// Colour members by stress.
    pub stress_coloring: bool,
    /// Draw joint forces.
    pub show_forces: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            proportional: true,
            frame: None,
            deformation_factor: None,
            stress_coloring: false,
            show_forces: false,
        }
    }
}

/// How a statistics series should be plotted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub title: String,
    pub y_label: String,
    pub markers: bool,
}

/// Serializable view of a truss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrussSnapshot {
    pub joints: Vec<JointSnapshot>,
    pub members: Vec<MemberSnapshot>,
    pub frame: Option<BoundingBox>,
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointSnapshot {
    pub position: Vec2,
    pub force: Option<Vec2>,
    pub simulation_fixed: AxisFlags,
    pub evolution_fixed: AxisFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub start: Vec2,
    pub end: Vec2,
    pub area: f64,
    /// Axial stress in Pa, when a stress-coloured view was requested.
    pub stress: Option<f64>,
}

impl TrussSnapshot {
    pub fn new(graph: &Graph, solution: Option<&TrussSolution>, options: &RenderOptions) -> Self {
        let joints = graph
            .vertices()
            .map(|(_, v)| JointSnapshot {
                position: v.position,
                force: if options.show_forces { v.force } else { None },
                simulation_fixed: v.simulation_fixed,
                evolution_fixed: v.evolution_fixed,
            })
            .collect();
        let members = graph
            .edges()
            .filter_map(|(e, edge)| {
                let (start, end) = graph.edge_positions(e)?;
                let stress = solution
                    .filter(|_| options.stress_coloring)
                    .and_then(|s| s.stress(e));
                Some(MemberSnapshot {
                    start,
                    end,
                    area: edge.area,
                    stress,
                })
            })
            .collect();
        let frame = options
            .frame
            .or_else(|| graph.bounding_box(1.1, 16.0 / 9.0));
        Self {
            joints,
            members,
            frame,
            options: options.clone(),
        }
    }
}

/// Sink for everything the chamber reports. All methods are
/// fire-and-forget.
pub trait Reporter {
    /// Called after the initial evaluation and after every generation.
    fn progress(&mut self, progress: &EvolutionProgress);

    /// A view of a truss, optionally with its analysis.
    fn truss(
        &mut self,
        name: &str,
        graph: &Graph,
        solution: Option<&TrussSolution>,
        options: &RenderOptions,
    );

    /// A (generation, value) series.
    fn series(&mut self, name: &str, points: &[StatPoint], options: &SeriesOptions);

    fn summary(&mut self, generation: usize, summary: &HistorySummary);

    fn finished(&mut self, _result: &EvolutionResult) {}
}

/// Reports through the `log` facade only.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn progress(&mut self, progress: &EvolutionProgress) {
        let top: Vec<String> = progress
            .top_fitnesses
            .iter()
            .map(|f| format!("{f:.4e}"))
            .collect();
        info!(
            "Generation {}/{}: best {:.4e} | top [{}] | mean {:.4e} | material {:.1} kg | max stress {:.4e} Pa{}",
            progress.generation,
            progress.total_generations,
            progress.best_fitness,
            top.join(", "),
            progress.top_mean,
            progress.best_material,
            progress.best_max_stress,
            if progress.improved { " | new best" } else { "" }
        );
    }

    fn truss(
        &mut self,
        name: &str,
        graph: &Graph,
        _solution: Option<&TrussSolution>,
        _options: &RenderOptions,
    ) {
        debug!(
            "{name}: {} joints, {} members",
            graph.vertex_count(),
            graph.edge_count()
        );
    }

    fn series(&mut self, name: &str, points: &[StatPoint], _options: &SeriesOptions) {
        if let Some(last) = points.last() {
            debug!(
                "{name}: {} points, last {:.4e} at generation {}",
                points.len(),
                last.value,
                last.generation
            );
        }
    }

    fn summary(&mut self, generation: usize, summary: &HistorySummary) {
        info!(
            "Statistics at generation {generation}: best {:.4e} (gen {}), best mean {:.4e} (gen {}), final mean {:.4e}, min std dev {:.4e} (gen {}), final std dev {:.4e}",
            summary.best_fitness.value,
            summary.best_fitness.generation,
            summary.best_mean.value,
            summary.best_mean.generation,
            summary.final_mean.value,
            summary.min_std_dev.value,
            summary.min_std_dev.generation,
            summary.final_std_dev.value
        );
    }

    fn finished(&mut self, result: &EvolutionResult) {
        info!(
            "Finished after {} generations: best {:.4e}, material {:.1} kg, max stress {:.4e} Pa",
            result.generations, result.best_fitness, result.best_material, result.best_max_stress
        );
    }
}

#[derive(Serialize)]
struct SeriesFile<'a> {
    name: &'a str,
    options: &'a SeriesOptions,
    points: &'a [StatPoint],
}

/// Logs like [`LogReporter`] and writes every view and series as a JSON
/// file into an output directory.
#[derive(Debug)]
pub struct JsonReporter {
    output_dir: PathBuf,
    log: LogReporter,
}

impl JsonReporter {
    /// Create the reporter, creating `dir` if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let output_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            log: LogReporter,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `value` to `<output_dir>/<name>.json`.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let path = self.output_dir.join(format!("{name}.json"));
        fs::write(&path, json)?;
        Ok(path)
    }

    fn save_logged<T: Serialize>(&self, name: &str, value: &T) {
        match self.save(name, value) {
            Ok(path) => debug!("Wrote {}", path.display()),
            Err(e) => warn!("Failed to write {name}: {e}"),
        }
    }
}

impl Reporter for JsonReporter {
    fn progress(&mut self, progress: &EvolutionProgress) {
        self.log.progress(progress);
    }

    fn truss(
        &mut self,
        name: &str,
        graph: &Graph,
        solution: Option<&TrussSolution>,
        options: &RenderOptions,
    ) {
        self.log.truss(name, graph, solution, options);
        self.save_logged(name, &TrussSnapshot::new(graph, solution, options));
    }

    fn series(&mut self, name: &str, points: &[StatPoint], options: &SeriesOptions) {
        self.log.series(name, points, options);
        self.save_logged(
            name,
            &SeriesFile {
                name,
                options,
                points,
            },
        );
    }

    fn summary(&mut self, generation: usize, summary: &HistorySummary) {
        self.log.summary(generation, summary);
        self.save_logged("summary", summary);
    }

    fn finished(&mut self, result: &EvolutionResult) {
        self.log.finished(result);
        self.save_logged("result", result);
    }
}
