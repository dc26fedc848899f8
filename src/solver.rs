use std::f64::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;

use crate::disc::advection1d::Advection1d;
use crate::disc::collocated::{CurvilinearOperators2d, RectilinearOperators};
use crate::disc::diffusion::Diffusion;
use crate::disc::flux::{DiffusionTensor, Flux};
use crate::disc::linear_elliptic::{ComplexField, Helmholtz2d, HelmholtzCoefficient};
use crate::disc::mesh::collocated::CollocatedGrid;
use crate::disc::mesh::staggered::{StaggeredAxis, StaggeredGrid};
use crate::disc::tensor::StaggeredOperators;
use crate::disc::{FluxOperators, SpatialDisc};
use crate::error::{MimeticError, Result};
use crate::initialization::{
    ExampleParameters, FluxOperator2dParameters, FluxOperator3dParameters,
    Helmholtz2dParameters, Hyperbolic1dParameters, ParabolicParameters, SolverParameters,
    WallBox,
};
use crate::io::write_to_csv::write_matrix_csv;
use crate::io::write_to_txt::TextDump;
use crate::temporal_disc::{TemporalDisc, TimeScheme};

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub example: &'static str,
    pub steps: usize,
    pub final_time: f64,
    /// Root-mean-square error against the exact solution, where one is known.
    pub rms_error: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// Text dump written by the run.
    pub output: PathBuf,
}

pub fn run(params: &SolverParameters) -> Result<RunSummary> {
    params.validate()?;
    let output = Path::new(&params.output);
    match &params.example {
        ExampleParameters::Hyperbolic1d(p) => hyperbolic_1d(params.order, p, params.checkpoints, output),
        ExampleParameters::Parabolic(p) => parabolic(params.order, p, params.checkpoints, output),
        ExampleParameters::FluxOperator2d(p) => {
            flux_operator_2d(params.order, p, params.checkpoints, output)
        }
        ExampleParameters::FluxOperator3d(p) => {
            flux_operator_3d(params.order, p, params.checkpoints, output)
        }
        ExampleParameters::Helmholtz2d(p) => helmholtz_2d(params.order, p, output),
    }
}

/// Steps between two checkpoints; zero checkpoints keeps the final state only.
fn checkpoint_interval(steps: usize, checkpoints: usize) -> usize {
    if checkpoints == 0 {
        steps.max(1)
    } else {
        steps.div_ceil(checkpoints).max(1)
    }
}

fn extrema(u: &Array1<f64>) -> (f64, f64) {
    (*u.min_skipnan(), *u.max_skipnan())
}

/// Marches `steps` steps, dumping the initial state and every checkpoint.
fn march_with_checkpoints<T, E>(
    temporal: &mut TemporalDisc,
    disc: &T,
    u: &mut Array1<f64>,
    steps: usize,
    checkpoints: usize,
    dump: &mut TextDump<BufWriter<File>>,
    coords: &[Array1<f64>],
    exact: E,
) -> Result<()>
where
    T: SpatialDisc,
    E: Fn(f64) -> Option<Array1<f64>>,
{
    let every = checkpoint_interval(steps, checkpoints);
    let initial_exact = exact(temporal.curr_time);
    dump.write_block(coords, u.view(), initial_exact.as_ref().map(|e| e.view()))?;
    temporal.time_march(disc, u, steps, |step, time, u| {
        if step % every == 0 || step == steps {
            let (min, max) = extrema(u);
            log::info!(
                "checkpoint at step {}/{} (t = {:.6}): min {:.6e}, max {:.6e}",
                step,
                steps,
                time,
                min,
                max
            );
            let reference = exact(time);
            dump.write_block(coords, u.view(), reference.as_ref().map(|e| e.view()))?;
        }
        Ok(())
    })
}

fn dump_path(output: &Path, example: &str) -> PathBuf {
    output.join(format!("{}.txt", example))
}

fn gaussian(point: &[f64], centre: &[f64], sigma: f64) -> f64 {
    let r2: f64 = point
        .iter()
        .zip(centre.iter())
        .map(|(p, c)| (p - c) * (p - c))
        .sum();
    (-r2 / (2.0 * sigma * sigma)).exp()
}

/// The requested step, or the stable one; a larger request is only warned about.
fn diffusion_time_step(requested: Option<f64>, stable: f64) -> f64 {
    match requested {
        Some(dt) => {
            if dt > stable {
                log::warn!(
                    "dt = {:.3e} exceeds the explicit stability bound {:.3e}",
                    dt,
                    stable
                );
            }
            dt
        }
        None => stable,
    }
}

pub fn hyperbolic_1d(
    order: usize,
    p: &Hyperbolic1dParameters,
    checkpoints: usize,
    output: &Path,
) -> Result<RunSummary> {
    let axis = StaggeredAxis::new(p.cells, p.west, p.east)?;
    let disc = Advection1d::new(order, axis, p.velocity)?;
    let dt = p.cfl * disc.cfl_time_step();
    let mut temporal = TemporalDisc::new(
        TimeScheme::Leapfrog {
            propagator: disc.propagator(dt),
        },
        dt,
    )?;
    let steps = temporal.step_count(p.final_time);
    let length = p.east - p.west;
    let x = axis.nodes();
    let exact = |t: f64| -> Array1<f64> {
        x.mapv(|xi| (2.0 * PI * (xi - p.west - p.velocity * t) / length).sin())
    };
    let mut u = exact(0.0);
    disc.apply_bc(&mut u);
    log::info!(
        "hyperbolic 1d: order {}, {} cells, a = {}, dt = {:.4e}, {} steps",
        order,
        p.cells,
        p.velocity,
        dt,
        steps
    );

    let path = dump_path(output, "hyperbolic_1d");
    let mut dump = TextDump::create(&path)?;
    march_with_checkpoints(
        &mut temporal,
        &disc,
        &mut u,
        steps,
        checkpoints,
        &mut dump,
        &[x.clone()],
        |t| Some(exact(t)),
    )?;
    dump.finish()?;

    let reference = exact(temporal.curr_time);
    let cells = p.cells as f64;
    let sq: f64 = (1..=p.cells).map(|i| (u[i] - reference[i]).powi(2)).sum();
    let rms = (sq / cells).sqrt();
    log::info!("hyperbolic 1d finished: rms error {:.4e}", rms);
    let (min, max) = extrema(&u);
    Ok(RunSummary {
        example: "hyperbolic_1d",
        steps,
        final_time: temporal.curr_time,
        rms_error: Some(rms),
        min,
        max,
        output: path,
    })
}

pub fn parabolic(
    order: usize,
    p: &ParabolicParameters,
    checkpoints: usize,
    output: &Path,
) -> Result<RunSummary> {
    let axes = p
        .cells
        .iter()
        .map(|&m| StaggeredAxis::new(m, p.west, p.east))
        .collect::<Result<Vec<_>>>()?;
    let grid = StaggeredGrid::new(axes.clone())?;
    let operators = StaggeredOperators::new(order, &axes)?;
    // K = diag(1 + x_a), sampled on the faces where each gradient component lives
    let coefficients = (0..grid.dim())
        .map(|a| grid.sample_faces(a, |pt| 1.0 + pt[a]))
        .collect();
    let disc = Diffusion::with_zero_dirichlet(
        operators,
        Flux::Diagonal(coefficients),
        grid.boundary_indices(),
    )?;
    let dt = diffusion_time_step(p.dt, disc.stable_time_step());
    let mut temporal = TemporalDisc::new(TimeScheme::ExplicitEuler, dt)?;
    let steps = temporal.step_count(p.final_time);

    let centre = vec![0.5 * (p.west + p.east); grid.dim()];
    let mut u = grid.sample(|pt| gaussian(pt, &centre, p.sigma));
    disc.apply_bc(&mut u);
    let volume = grid.cell_volume();
    log::info!(
        "parabolic {}d: order {}, cells {:?}, dt = {:.4e}, {} steps, initial mass {:.6e}",
        grid.dim(),
        order,
        p.cells,
        dt,
        steps,
        u.sum() * volume
    );

    let path = dump_path(output, "parabolic");
    let mut dump = TextDump::create(&path)?;
    march_with_checkpoints(
        &mut temporal,
        &disc,
        &mut u,
        steps,
        checkpoints,
        &mut dump,
        &grid.node_coordinates(),
        |_| None,
    )?;
    dump.finish()?;
    log::info!("parabolic finished: mass {:.6e}", u.sum() * volume);
    let (min, max) = extrema(&u);
    Ok(RunSummary {
        example: "parabolic",
        steps,
        final_time: temporal.curr_time,
        rms_error: None,
        min,
        max,
        output: path,
    })
}

/// Explicit anisotropic diffusion of a Gaussian on a collocated grid with
/// zero Dirichlet boundaries.
fn collocated_diffusion<O: FluxOperators>(
    example: &'static str,
    operators: O,
    grid: &CollocatedGrid,
    tensor: &[Vec<f64>],
    sigma: f64,
    final_time: f64,
    requested_dt: Option<f64>,
    checkpoints: usize,
    output: &Path,
) -> Result<RunSummary> {
    let n = grid.node_count();
    let flux = Flux::Anisotropic(DiffusionTensor::uniform(tensor, n)?);
    let disc = Diffusion::with_zero_dirichlet(operators, flux, grid.boundary_indices())?;
    let dt = diffusion_time_step(requested_dt, disc.stable_time_step());
    let mut temporal = TemporalDisc::new(TimeScheme::ExplicitEuler, dt)?;
    let steps = temporal.step_count(final_time);
    let centre = vec![0.5; grid.dim()];
    let mut u = grid.sample(|pt| gaussian(pt, &centre, sigma));
    disc.apply_bc(&mut u);
    log::info!(
        "{}: {:?} nodes, dt = {:.4e}, {} steps",
        example,
        grid.shape,
        dt,
        steps
    );

    let path = dump_path(output, example);
    let mut dump = TextDump::create(&path)?;
    march_with_checkpoints(
        &mut temporal,
        &disc,
        &mut u,
        steps,
        checkpoints,
        &mut dump,
        &grid.coords,
        |_| None,
    )?;
    dump.finish()?;
    let (min, max) = extrema(&u);
    log::info!("{} finished: min {:.6e}, max {:.6e}", example, min, max);
    Ok(RunSummary {
        example,
        steps,
        final_time: temporal.curr_time,
        rms_error: None,
        min,
        max,
        output: path,
    })
}

pub fn flux_operator_2d(
    order: usize,
    p: &FluxOperator2dParameters,
    checkpoints: usize,
    output: &Path,
) -> Result<RunSummary> {
    let (ax, ay) = (p.amplitude_x, p.amplitude_y);
    let grid = CollocatedGrid::from_mapping(p.nodes, |xi, eta| {
        (
            (1.0 + ax * (2.0 * PI * eta).sin()) * xi,
            (1.0 + ay * (2.0 * PI * xi).cos()) * eta,
        )
    })?;
    let operators = CurvilinearOperators2d::new(order, &grid)?;
    collocated_diffusion(
        "flux_operator_2d",
        operators,
        &grid,
        &p.tensor,
        p.sigma,
        p.final_time,
        p.dt,
        checkpoints,
        output,
    )
}

pub fn flux_operator_3d(
    order: usize,
    p: &FluxOperator3dParameters,
    checkpoints: usize,
    output: &Path,
) -> Result<RunSummary> {
    let grid = CollocatedGrid::uniform(&p.nodes, &[(0.0, 1.0); 3])?;
    let operators = RectilinearOperators::new(order, &grid)?;
    collocated_diffusion(
        "flux_operator_3d",
        operators,
        &grid,
        &p.tensor,
        p.sigma,
        p.final_time,
        p.dt,
        checkpoints,
        output,
    )
}

fn in_wall(x: f64, y: f64, walls: &[WallBox], extent: f64, margin: f64) -> bool {
    let boxed = walls
        .iter()
        .any(|[[x0, x1], [y0, y1]]| x >= *x0 && x <= *x1 && y >= *y0 && y <= *y1);
    boxed || x <= margin || x >= extent - margin || y <= margin || y >= extent - margin
}

pub fn helmholtz_2d(order: usize, p: &Helmholtz2dParameters, output: &Path) -> Result<RunSummary> {
    let x_axis = StaggeredAxis::new(p.cells[0], 0.0, p.extent)?;
    let y_axis = StaggeredAxis::new(p.cells[1], 0.0, p.extent)?;
    let grid = StaggeredGrid::new(vec![x_axis, y_axis])?;
    let coords = grid.node_coordinates();
    let (xs, ys) = (&coords[0], &coords[1]);

    let wall = ndarray::Zip::from(xs)
        .and(ys)
        .map_collect(|&x, &y| {
            if in_wall(x, y, &p.walls, p.extent, p.wall_margin) {
                1.0
            } else {
                0.0
            }
        });
    let coefficient = HelmholtzCoefficient {
        wave_number: p.wave_number,
        reflection: p.reflection,
        absorption: p.absorption,
    };
    let field = ComplexField::from_walls(&coefficient, wall.view());
    let helmholtz = Helmholtz2d::assemble(order, x_axis, y_axis, &field, p.boundary)?;

    let [hx, hy] = p.hotspot;
    let hotspot: Vec<usize> = (0..grid.node_count())
        .filter(|&i| (xs[i] - hx).hypot(ys[i] - hy) <= p.hotspot_radius)
        .collect();
    if hotspot.is_empty() {
        return Err(MimeticError::InvalidParameter {
            name: "hotspot",
            reason: format!(
                "no node within {} of ({}, {})",
                p.hotspot_radius, hx, hy
            ),
        });
    }
    log::info!(
        "helmholtz 2d: order {}, {:?} cells, {} wall nodes, {} hotspot nodes",
        order,
        p.cells,
        wall.iter().filter(|&&w| w > 0.0).count(),
        hotspot.len()
    );
    let solution = helmholtz.solve_with_fixed(&hotspot, p.hotspot_value)?;
    let magnitude = solution.magnitude();
    let log_magnitude = magnitude.mapv(|m| m.max(f64::MIN_POSITIVE).ln());

    let shape = grid.node_shape();
    let table = Array2::from_shape_vec((shape[1], shape[0]), log_magnitude.to_vec()).map_err(
        |_| MimeticError::DimensionMismatch {
            context: "helmholtz output table",
            expected: shape[0] * shape[1],
            found: log_magnitude.len(),
        },
    )?;
    write_matrix_csv(output.join("helmholtz_2d.csv"), table.view())?;

    let path = dump_path(output, "helmholtz_2d");
    let mut dump = TextDump::create(&path)?;
    dump.write_block(&coords, magnitude.view(), None)?;
    dump.finish()?;

    let (min, max) = extrema(&magnitude);
    Ok(RunSummary {
        example: "helmholtz_2d",
        steps: 0,
        final_time: 0.0,
        rms_error: None,
        min,
        max,
        output: path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::boundary::BoundaryCondition;

    #[test]
    fn test_checkpoint_interval() {
        assert_eq!(checkpoint_interval(100, 10), 10);
        assert_eq!(checkpoint_interval(101, 10), 11);
        assert_eq!(checkpoint_interval(5, 10), 1);
        assert_eq!(checkpoint_interval(7, 0), 7);
        assert_eq!(checkpoint_interval(0, 0), 1);
    }

    #[test]
    fn test_wall_indicator() {
        let walls = vec![[[10.0, 39.0], [20.0, 21.0]]];
        assert!(in_wall(15.0, 20.5, &walls, 40.0, 0.5));
        assert!(in_wall(0.25, 5.0, &walls, 40.0, 0.5));
        assert!(in_wall(5.0, 39.75, &walls, 40.0, 0.5));
        assert!(!in_wall(5.0, 5.0, &walls, 40.0, 0.5));
    }

    #[test]
    fn test_hyperbolic_run_writes_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let p = Hyperbolic1dParameters {
            cells: 40,
            final_time: 0.5,
            ..Default::default()
        };
        let summary = hyperbolic_1d(2, &p, 4, dir.path()).unwrap();
        assert_eq!(summary.steps, 40);
        assert!(summary.rms_error.unwrap() < 0.05);
        let text = std::fs::read_to_string(&summary.output).unwrap();
        // initial state plus four checkpoints
        assert_eq!(text.split("\n\n").count(), 5);
        assert_eq!(text.lines().next().unwrap().split_whitespace().count(), 3);
    }

    #[test]
    fn test_small_helmholtz_run() {
        let dir = tempfile::tempdir().unwrap();
        let p = Helmholtz2dParameters {
            cells: [10, 10],
            extent: 10.0,
            wave_number: 1.0,
            hotspot: [2.0, 5.0],
            walls: vec![[[6.0, 7.0], [1.0, 8.0]]],
            boundary: BoundaryCondition::Dirichlet,
            ..Default::default()
        };
        let summary = helmholtz_2d(2, &p, dir.path()).unwrap();
        assert!(summary.max >= 1.0);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(dir.path().join("helmholtz_2d.csv"))
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].len(), 12);
    }

    #[test]
    fn test_missing_hotspot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = Helmholtz2dParameters {
            cells: [8, 8],
            extent: 8.0,
            hotspot: [100.0, 100.0],
            ..Default::default()
        };
        assert!(matches!(
            helmholtz_2d(2, &p, dir.path()),
            Err(MimeticError::InvalidParameter { name: "hotspot", .. })
        ));
    }
}
