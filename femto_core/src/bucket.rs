//! Bucket-jump detection and correction.
//!
//! The laser locks to one of many RF buckets per laser period. If it slips to
//! a neighbouring bucket the counter reads a whole number of buckets away from
//! the model. A clean slip is undone by moving the phase shifter back by the
//! exact bucket count and shifting the model offset by the same amount, so the
//! target time stays put.
use femto_traits::ChannelService;

use crate::actuator::PhaseActuator;
use crate::config::JumpCfg;
use crate::error::LockError;
use crate::link::Link;
use crate::sawtooth::ModelParameters;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketDecision {
    /// Buckets owed; 0 means no correction.
    pub buckets: i64,
    /// Non-integer part of the timing error (ns).
    pub residual_ns: f64,
    /// `buckets` expressed in ns.
    pub exact_correction_ns: f64,
}

impl BucketDecision {
    pub const NONE: Self = Self {
        buckets: 0,
        residual_ns: 0.0,
        exact_correction_ns: 0.0,
    };
}

/// Why a decision was or was not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Trusted,
    /// Spread is zero (no fresh data) or too wide for the residual to mean anything.
    Untrusted,
    /// Spread is fine but the error is not close to a whole number of buckets.
    NonInteger,
}

/// Split `measured − predicted` into whole buckets and a residual, then gate it.
pub fn assess(
    measured_ns: f64,
    predicted_ns: f64,
    spread_ns: f64,
    locking_ghz: f64,
    max_jump_error_ns: f64,
) -> (BucketDecision, Gate) {
    let terror = measured_ns - predicted_ns;
    let raw = (terror * locking_ghz).round();
    let residual_ns = terror - raw / locking_ghz;

    let gate = if spread_ns > 2.0 * max_jump_error_ns || spread_ns == 0.0 {
        Gate::Untrusted
    } else if residual_ns.abs() > max_jump_error_ns {
        Gate::NonInteger
    } else {
        Gate::Trusted
    };
    let buckets = if gate == Gate::Trusted { raw as i64 } else { 0 };
    (
        BucketDecision {
            buckets,
            residual_ns,
            exact_correction_ns: buckets as f64 / locking_ghz,
        },
        gate,
    )
}

#[derive(Debug, Clone)]
pub struct BucketJumpCorrector {
    cfg: JumpCfg,
    locking_ghz: f64,
}

/// Result of a corrective move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub from_ns: f64,
    pub to_ns: f64,
    pub new_offset_ns: f64,
}

impl BucketJumpCorrector {
    pub fn new(cfg: JumpCfg, locking_ghz: f64) -> Self {
        Self { cfg, locking_ghz }
    }

    pub fn assess(&self, measured_ns: f64, predicted_ns: f64, spread_ns: f64) -> (BucketDecision, Gate) {
        assess(
            measured_ns,
            predicted_ns,
            spread_ns,
            self.locking_ghz,
            self.cfg.max_jump_error_ns,
        )
    }

    /// Move the phase shifter by the owed buckets (wrapped into one period)
    /// and shift the offset by the move actually made, persisting it and
    /// bumping the correction counter.
    pub fn apply<S: ChannelService>(
        &self,
        link: &mut Link<S>,
        actuator: &mut PhaseActuator,
        params: &mut ModelParameters,
        decision: &BucketDecision,
    ) -> Result<Option<Correction>, LockError> {
        if decision.buckets == 0 {
            return Ok(None);
        }
        if decision.residual_ns.abs() > self.cfg.max_jump_error_ns {
            return Err(LockError::State(format!(
                "refusing non-integer correction (residual {:.4} ns)",
                decision.residual_ns
            )));
        }
        let ch = link.ch();
        link.put_status("Fixing Jump")?;
        let from_ns = actuator.get_position(link)?;
        let target = (from_ns - decision.exact_correction_ns).rem_euclid(params.period_ns);
        actuator.move_to(link, target)?;
        link.sleep(self.cfg.settle);
        let to_ns = actuator.commanded_ns();

        params.offset_ns -= to_ns - from_ns;
        link.put(&ch.offset, params.offset_ns)?;
        let count = link.get(&ch.bucket_counter)?;
        link.put(&ch.bucket_counter, count + 1)?;
        link.put_status("Done Fixing Jump")?;
        tracing::info!(
            buckets = decision.buckets,
            residual_ns = decision.residual_ns,
            from_ns,
            to_ns,
            offset_ns = params.offset_ns,
            "bucket jump corrected"
        );
        Ok(Some(Correction {
            from_ns,
            to_ns,
            new_offset_ns: params.offset_ns,
        }))
    }
}
