use super::{Move, MoveContext, MoveStats};
use crate::core::models::change::Change;
use crate::core::models::space::Space;
use crate::engine::error::EngineError;
use crate::engine::polarization::{PolarizationParams, relax_induced_dipoles};
use rand::RngCore;

/// Wraps a geometric move and relaxes induced dipoles after every successful proposal.
///
/// Because relaxation changes the moment of every polarizable particle, the resulting change
/// covers all groups. A relaxation that does not converge aborts the attempt with an error and
/// leaves the space synchronized.
#[derive(Debug)]
pub struct PolarizeMove<M: ?Sized = dyn Move> {
    name: String,
    params: PolarizationParams,
    inner: Box<M>,
}

impl<M: Move + ?Sized> PolarizeMove<M> {
    pub fn new(inner: Box<M>, params: PolarizationParams) -> Self {
        Self {
            name: format!("polarize({})", inner.name()),
            params,
            inner,
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn params(&self) -> &PolarizationParams {
        &self.params
    }
}

impl<M: Move + ?Sized> Move for PolarizeMove<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(
        &mut self,
        space: &mut Space,
        ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Change>, EngineError> {
        let Some(moved) = self.inner.propose(space, ctx, rng)? else {
            return Ok(None);
        };
        let (geometry, trial) = space.split_trial();
        let relaxed = relax_induced_dipoles(
            trial,
            geometry,
            ctx.nonbonded.potential(),
            ctx.table,
            &self.params,
        );
        if let Err(e) = relaxed {
            space.reset_trial();
            return Err(e);
        }
        let mut change = Change::everything(space.trial().groups().len());
        for group in moved.groups() {
            change.push(group.clone());
        }
        Ok(Some(change))
    }

    fn acceptance_bias(&self, space: &Space, change: &Change) -> f64 {
        self.inner.acceptance_bias(space, change)
    }

    fn last_square_displacement(&self) -> f64 {
        self.inner.last_square_displacement()
    }

    fn repeat(&self, space: &Space) -> usize {
        self.inner.repeat(space)
    }

    fn stats(&self) -> &MoveStats {
        self.inner.stats()
    }

    fn stats_mut(&mut self) -> &mut MoveStats {
        self.inner.stats_mut()
    }
}
