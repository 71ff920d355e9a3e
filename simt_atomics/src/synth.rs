//! Ordering escalation.
//!
//! A [`Ladder`] lists, per accepted memory order, the leaf that order adds
//! and the weaker order it then falls into. Resolving an order walks the
//! ladder from its rung down to the first `Stop`, so a stronger order always
//! executes its own action followed by everything the weaker rung would have
//! done. Orders without a rung are rejected, as are raw values that are not
//! memory orders at all; the emitted code traps on both.

use crate::catalog::{FenceStrength, NativeRmw, Operation, Scope, Width};
use crate::error::{DispatchFault, Error, Result};
use crate::ordering::{MemoryOrder, Semantics, Strength};
use crate::template::Leaf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    FallsInto(MemoryOrder),
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rung {
    pub order: MemoryOrder,
    pub action: Option<Leaf>,
    pub next: Next,
}

impl Rung {
    fn stop(order: MemoryOrder, action: Leaf) -> Self {
        Self {
            order,
            action: Some(action),
            next: Next::Stop,
        }
    }

    fn falls(order: MemoryOrder, action: Option<Leaf>, into: MemoryOrder) -> Self {
        Self {
            order,
            action,
            next: Next::FallsInto(into),
        }
    }
}

/// One `match` arm of an emitted dispatch: every order in `orders` runs
/// `plan` in sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arm {
    pub orders: Vec<MemoryOrder>,
    pub plan: Vec<Leaf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ladder {
    rungs: Vec<Rung>,
}

impl Ladder {
    /// Builds a ladder, checking that every order appears at most once,
    /// every `FallsInto` target has a rung, and no chain loops.
    pub fn new(operation: Operation, scope: Scope, rungs: Vec<Rung>) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedLadder {
            operation,
            scope,
            reason,
        };
        for (i, rung) in rungs.iter().enumerate() {
            if rungs[..i].iter().any(|r| r.order == rung.order) {
                return Err(malformed(format!("{} has two rungs", rung.order)));
            }
        }
        let ladder = Self { rungs };
        for rung in &ladder.rungs {
            let mut hops = 0;
            let mut cursor = *rung;
            while let Next::FallsInto(weaker) = cursor.next {
                cursor = *ladder
                    .rung(weaker)
                    .ok_or_else(|| {
                        malformed(format!("{} falls into missing {weaker}", cursor.order))
                    })?;
                hops += 1;
                if hops > ladder.rungs.len() {
                    return Err(malformed(format!("{} never stops", rung.order)));
                }
            }
        }
        Ok(ladder)
    }

    /// seq_cst takes the sc fence; every other order except relaxed ends on
    /// the acq_rel fence; relaxed does nothing.
    pub fn for_fence(scope: Scope) -> Result<Self> {
        use MemoryOrder::*;
        Self::new(
            Operation::Fence,
            scope,
            vec![
                Rung::stop(SeqCst, Leaf::fence(scope, FenceStrength::SeqCst)),
                Rung::falls(Consume, None, Acquire),
                Rung::falls(Acquire, None, AcqRel),
                Rung::stop(AcqRel, Leaf::fence(scope, FenceStrength::AcqRel)),
                Rung::falls(Release, None, AcqRel),
                Rung {
                    order: Relaxed,
                    action: None,
                    next: Next::Stop,
                },
            ],
        )
    }

    pub fn for_load(scope: Scope, width: Width) -> Result<Self> {
        use MemoryOrder::*;
        Self::new(
            Operation::Load,
            scope,
            vec![
                Rung::falls(SeqCst, Some(Leaf::fence(scope, FenceStrength::SeqCst)), Consume),
                Rung::falls(Consume, None, Acquire),
                Rung::stop(Acquire, Leaf::load(scope, width, Semantics::Acquire)?),
                Rung::stop(Relaxed, Leaf::load(scope, width, Semantics::Relaxed)?),
            ],
        )
    }

    pub fn for_store(scope: Scope, width: Width) -> Result<Self> {
        use MemoryOrder::*;
        Self::new(
            Operation::Store,
            scope,
            vec![
                Rung::stop(Release, Leaf::store(scope, width, Semantics::Release)?),
                Rung::falls(SeqCst, Some(Leaf::fence(scope, FenceStrength::SeqCst)), Relaxed),
                Rung::stop(Relaxed, Leaf::store(scope, width, Semantics::Relaxed)?),
            ],
        )
    }

    /// Shared by exchange, the fetch ops, compare-and-swap (on the combined
    /// order) and the pointer ops. seq_cst is the sc fence followed by the
    /// acq_rel instruction.
    pub fn for_rmw(
        operation: Operation,
        scope: Scope,
        width: Width,
        op: NativeRmw,
    ) -> Result<Self> {
        use MemoryOrder::*;
        let leaf = |sem| Leaf::rmw(scope, width, sem, op);
        Self::new(
            operation,
            scope,
            vec![
                Rung::falls(SeqCst, Some(Leaf::fence(scope, FenceStrength::SeqCst)), AcqRel),
                Rung::falls(Consume, None, Acquire),
                Rung::stop(Acquire, leaf(Semantics::Acquire)?),
                Rung::stop(AcqRel, leaf(Semantics::AcqRel)?),
                Rung::stop(Release, leaf(Semantics::Release)?),
                Rung::stop(Relaxed, leaf(Semantics::Relaxed)?),
            ],
        )
    }

    pub fn rung(&self, order: MemoryOrder) -> Option<&Rung> {
        self.rungs.iter().find(|rung| rung.order == order)
    }

    pub fn accepts(&self, order: MemoryOrder) -> bool {
        self.rung(order).is_some()
    }

    /// `action(order) ++ escalate(next(order))`, or `None` when the order
    /// has no rung.
    pub fn escalate(&self, order: MemoryOrder) -> Option<Vec<Leaf>> {
        let rung = self.rung(order)?;
        let mut plan: Vec<Leaf> = rung.action.into_iter().collect();
        if let Next::FallsInto(weaker) = rung.next {
            plan.extend(self.escalate(weaker)?);
        }
        Some(plan)
    }

    pub fn resolve(&self, raw: i32) -> std::result::Result<Vec<Leaf>, DispatchFault> {
        let order = MemoryOrder::from_raw(raw).ok_or(DispatchFault::Unrecognized(raw))?;
        self.escalate(order).ok_or(DispatchFault::Unsupported(order))
    }

    /// Compare-and-swap dispatch: both raw orders must decode, then the
    /// combined strength walks this ladder.
    pub fn resolve_pair(
        &self,
        success: i32,
        failure: i32,
    ) -> std::result::Result<Vec<Leaf>, DispatchFault> {
        let success = MemoryOrder::from_raw(success).ok_or(DispatchFault::Unrecognized(success))?;
        let failure = MemoryOrder::from_raw(failure).ok_or(DispatchFault::Unrecognized(failure))?;
        let combined = MemoryOrder::stronger(success, failure);
        self.escalate(combined).ok_or(DispatchFault::Unsupported(combined))
    }

    /// Rungs grouped by identical plans, in rung order.
    pub fn arms(&self) -> Vec<Arm> {
        let mut arms: Vec<Arm> = Vec::new();
        for rung in &self.rungs {
            let Some(plan) = self.escalate(rung.order) else {
                continue;
            };
            match arms.iter_mut().find(|arm| arm.plan == plan) {
                Some(arm) => arm.orders.push(rung.order),
                None => arms.push(Arm {
                    orders: vec![rung.order],
                    plan,
                }),
            }
        }
        arms
    }

    /// Every leaf the ladder can reach, first use first.
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        for rung in &self.rungs {
            if let Some(leaf) = rung.action {
                if !leaves.contains(&leaf) {
                    leaves.push(leaf);
                }
            }
        }
        leaves
    }
}

/// Combined guarantees of running `plan`.
pub fn plan_strength(plan: &[Leaf]) -> Strength {
    plan.iter()
        .fold(Strength::default(), |acc, leaf| acc.join(&leaf.strength()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use MemoryOrder::*;

    fn rmw_ladder() -> Ladder {
        Ladder::for_rmw(
            Operation::Rmw(crate::catalog::RmwOp::FetchAdd),
            Scope::Device,
            Width::W32,
            NativeRmw::Add,
        )
        .unwrap()
    }

    fn rmw(sem: Semantics) -> Leaf {
        Leaf::rmw(Scope::Device, Width::W32, sem, NativeRmw::Add).unwrap()
    }

    #[test]
    fn rmw_seq_cst_is_fence_then_acq_rel() {
        let ladder = rmw_ladder();
        assert_eq!(
            ladder.escalate(SeqCst).unwrap(),
            vec![Leaf::fence(Scope::Device, FenceStrength::SeqCst), rmw(Semantics::AcqRel)]
        );
        assert_eq!(ladder.escalate(AcqRel).unwrap(), vec![rmw(Semantics::AcqRel)]);
        assert_eq!(ladder.escalate(Consume).unwrap(), vec![rmw(Semantics::Acquire)]);
        assert_eq!(ladder.escalate(Release).unwrap(), vec![rmw(Semantics::Release)]);
        assert_eq!(ladder.escalate(Relaxed).unwrap(), vec![rmw(Semantics::Relaxed)]);
    }

    #[test]
    fn rmw_ladder_is_monotone() {
        let ladder = rmw_ladder();
        let strength = |order| plan_strength(&ladder.escalate(order).unwrap());
        let (sc, acq_rel, relaxed) = (strength(SeqCst), strength(AcqRel), strength(Relaxed));
        assert!(sc.covers(&acq_rel) && sc != acq_rel);
        assert!(acq_rel.covers(&relaxed) && acq_rel != relaxed);
        for order in MemoryOrder::ALL {
            assert!(strength(order).covers(&order.strength()), "{order}");
        }
    }

    #[test]
    fn load_never_releases_and_store_never_acquires() {
        for width in Width::ALL {
            let load = Ladder::for_load(Scope::Block, width).unwrap();
            let store = Ladder::for_store(Scope::Block, width).unwrap();
            for order in MemoryOrder::ALL {
                if let Some(plan) = load.escalate(order) {
                    assert!(plan.iter().all(|leaf| leaf.semantics() != Some(Semantics::Release)));
                }
                if let Some(plan) = store.escalate(order) {
                    assert!(plan.iter().all(|leaf| leaf.semantics() != Some(Semantics::Acquire)));
                }
            }
            assert!(!load.accepts(Release) && !load.accepts(AcqRel));
            assert!(!store.accepts(Acquire) && !store.accepts(Consume) && !store.accepts(AcqRel));
        }
    }

    #[test]
    fn store_seq_cst_fences_then_stores_relaxed() {
        let store = Ladder::for_store(Scope::System, Width::W16).unwrap();
        assert_eq!(
            store.escalate(SeqCst).unwrap(),
            vec![
                Leaf::fence(Scope::System, FenceStrength::SeqCst),
                Leaf::store(Scope::System, Width::W16, Semantics::Relaxed).unwrap(),
            ]
        );
    }

    #[test]
    fn fence_arms_collapse_to_three_plans() {
        let fence = Ladder::for_fence(Scope::Block).unwrap();
        let arms = fence.arms();
        assert_eq!(arms.len(), 3);
        assert_eq!(arms[0].orders, vec![SeqCst]);
        assert_eq!(arms[1].orders, vec![Consume, Acquire, AcqRel, Release]);
        assert_eq!(arms[2].orders, vec![Relaxed]);
        assert!(arms[2].plan.is_empty());
    }

    #[test]
    fn unknown_raw_order_faults() {
        let ladder = rmw_ladder();
        assert_eq!(ladder.resolve(6), Err(DispatchFault::Unrecognized(6)));
        assert_eq!(ladder.resolve(-3), Err(DispatchFault::Unrecognized(-3)));
        assert_eq!(ladder.resolve_pair(2, 99), Err(DispatchFault::Unrecognized(99)));
        let load = Ladder::for_load(Scope::Block, Width::W32).unwrap();
        assert_eq!(load.resolve(Release.raw()), Err(DispatchFault::Unsupported(Release)));
    }

    #[test]
    fn pair_resolution_uses_combined_strength() {
        let ladder = rmw_ladder();
        assert_eq!(
            ladder.resolve_pair(Release.raw(), Acquire.raw()).unwrap(),
            vec![rmw(Semantics::AcqRel)]
        );
        assert_eq!(
            ladder.resolve_pair(Relaxed.raw(), Acquire.raw()).unwrap(),
            vec![rmw(Semantics::Acquire)]
        );
    }

    #[test]
    fn dangling_and_cyclic_ladders_are_rejected() {
        let dangling = Ladder::new(
            Operation::Fence,
            Scope::Block,
            vec![Rung::falls(SeqCst, None, Acquire)],
        );
        assert!(matches!(dangling, Err(Error::MalformedLadder { .. })));

        let cyclic = Ladder::new(
            Operation::Fence,
            Scope::Block,
            vec![Rung::falls(Acquire, None, Release), Rung::falls(Release, None, Acquire)],
        );
        assert!(matches!(cyclic, Err(Error::MalformedLadder { .. })));

        let doubled = Ladder::new(
            Operation::Fence,
            Scope::Block,
            vec![
                Rung::stop(Relaxed, Leaf::fence(Scope::Block, FenceStrength::AcqRel)),
                Rung::stop(Relaxed, Leaf::fence(Scope::Block, FenceStrength::AcqRel)),
            ],
        );
        assert!(matches!(doubled, Err(Error::MalformedLadder { .. })));
    }

    #[test]
    fn leaves_follow_rung_order() {
        let ladder = rmw_ladder();
        assert_eq!(
            ladder.leaves(),
            vec![
                Leaf::fence(Scope::Device, FenceStrength::SeqCst),
                rmw(Semantics::Acquire),
                rmw(Semantics::AcqRel),
                rmw(Semantics::Release),
                rmw(Semantics::Relaxed),
            ]
        );
    }

    #[test]
    fn fence_ladder_uses_every_fence_strength() {
        for scope in Scope::ALL {
            let fence = Ladder::for_fence(scope).unwrap();
            let expected: Vec<Leaf> = FenceStrength::ALL
                .iter()
                .map(|strength| Leaf::fence(scope, *strength))
                .collect();
            assert_eq!(fence.leaves(), expected);
        }
    }
}
