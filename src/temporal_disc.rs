use ndarray::Array1;

use crate::disc::SpatialDisc;
use crate::disc::sparse::SparseMatrix;
use crate::error::{MimeticError, Result};

pub enum TimeScheme {
    ExplicitEuler,
    /// Two-level scheme `u_{n+1} = u_{n-1} + A u_n` with a precomputed `A`.
    Leapfrog { propagator: SparseMatrix },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LeapfrogState {
    /// The next step is the half-weight Euler start `u_1 = u_0 + A u_0 / 2`.
    Bootstrap,
    /// Holds `u_{n-1}`.
    Stepping(Array1<f64>),
}

pub struct TemporalDisc {
    pub time_scheme: TimeScheme,
    pub dt: f64,
    pub curr_time: f64,
    pub curr_step: usize,
    leapfrog_state: LeapfrogState,
    warned_non_finite: bool,
}

impl TemporalDisc {
    pub fn new(time_scheme: TimeScheme, dt: f64) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(MimeticError::InvalidParameter {
                name: "dt",
                reason: format!("time step must be finite and positive, got {}", dt),
            });
        }
        Ok(Self {
            time_scheme,
            dt,
            curr_time: 0.0,
            curr_step: 0,
            leapfrog_state: LeapfrogState::Bootstrap,
            warned_non_finite: false,
        })
    }
    /// `round(t_final / dt)`.
    pub fn step_count(&self, t_final: f64) -> usize {
        (t_final / self.dt).round().max(0.0) as usize
    }
    pub fn leapfrog_state(&self) -> &LeapfrogState {
        &self.leapfrog_state
    }
    pub fn advance<T: SpatialDisc>(&mut self, disc: &T, u: &mut Array1<f64>) -> Result<()> {
        match &self.time_scheme {
            TimeScheme::ExplicitEuler => {
                let rhs = disc.compute_rhs(u.view())?;
                u.scaled_add(self.dt, &rhs);
            }
            TimeScheme::Leapfrog { propagator } => {
                let au = propagator.dot(u.view())?;
                let previous =
                    std::mem::replace(&mut self.leapfrog_state, LeapfrogState::Bootstrap);
                self.leapfrog_state = match previous {
                    LeapfrogState::Bootstrap => {
                        let start = u.clone();
                        u.scaled_add(0.5, &au);
                        LeapfrogState::Stepping(start)
                    }
                    LeapfrogState::Stepping(prev) => {
                        let next = prev + &au;
                        LeapfrogState::Stepping(std::mem::replace(u, next))
                    }
                };
            }
        }
        disc.apply_bc(u);
        self.curr_step += 1;
        self.curr_time += self.dt;
        if !self.warned_non_finite && u.iter().any(|v| !v.is_finite()) {
            log::warn!(
                "non-finite values in the state at step {} (t = {:.6}); the time step may violate the stability bound",
                self.curr_step,
                self.curr_time
            );
            self.warned_non_finite = true;
        }
        Ok(())
    }
    /// Runs `steps` steps, calling `observer(step, time, u)` after each one.
    pub fn time_march<T, F>(
        &mut self,
        disc: &T,
        u: &mut Array1<f64>,
        steps: usize,
        mut observer: F,
    ) -> Result<()>
    where
        T: SpatialDisc,
        F: FnMut(usize, f64, &Array1<f64>) -> Result<()>,
    {
        log::info!("time marching {} steps with dt = {:.6e}", steps, self.dt);
        for _ in 0..steps {
            self.advance(disc, u)?;
            observer(self.curr_step, self.curr_time, u)?;
        }
        Ok(())
    }
}
