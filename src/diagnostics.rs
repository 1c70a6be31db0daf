//! Non-fatal events raised while parsing and resolving a CFG. None of these
//! ever become a hard `Err`: they are accumulated here (and logged via the
//! `log` facade at the point they occur) so a caller without the Datalog
//! consumer can still see why resolution was partial.

use std::fmt;

/// Why a jump target could not be resolved to a concrete, valid successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The lattice value at the terminator was `⊤`.
    ValueIsTop,
    /// The lattice value was a finite set but contained no `JUMPDEST` pc.
    NoValidTarget,
    /// Context-sensitive cloning hit `max_clones_per_pc` and was forced to
    /// meet (and widen) instead.
    CloneBudgetExhausted,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::ValueIsTop => write!(f, "jump target is unconstrained (top)"),
            UnresolvedReason::NoValidTarget => write!(f, "no candidate target is a JUMPDEST"),
            UnresolvedReason::CloneBudgetExhausted => {
                write!(f, "clone budget exhausted; contexts were merged")
            }
        }
    }
}

/// One `JUMP`/`JUMPI` terminator whose target set (or fallthrough
/// eligibility) could not be fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedJump {
    pub pc: u32,
    pub reason: UnresolvedReason,
}

/// A concrete candidate jump target that was dropped because it did not
/// land on a `JUMPDEST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    pub src_pc: u32,
    pub attempted_target: u64,
}

/// A resource bound the builder hit before reaching a fixed point.
///
/// `max_clones_per_pc` has no variant here: exhausting it at one pc only
/// forces that pc's contexts to merge and widen (see
/// `UnresolvedReason::CloneBudgetExhausted`), it doesn't abort the whole
/// build the way running out of `max_blocks` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLimit {
    MaxBlocks,
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLimit::MaxBlocks => write!(f, "max_blocks exceeded"),
        }
    }
}

/// Accumulated non-fatal diagnostics from a single parse + build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub unresolved_jumps: Vec<UnresolvedJump>,
    pub dropped_edges: Vec<DroppedEdge>,
    pub resource_limits_hit: Vec<ResourceLimit>,
    /// Set once cancellation was observed or a resource limit forced early
    /// termination; the returned CFG is a partial result.
    pub aborted: bool,
}

impl Diagnostics {
    pub fn record_unresolved(&mut self, pc: u32, reason: UnresolvedReason) {
        log::warn!("unresolved jump at pc {pc:#x}: {reason}");
        self.unresolved_jumps.push(UnresolvedJump { pc, reason });
    }

    pub fn record_dropped_edge(&mut self, src_pc: u32, attempted_target: u64) {
        log::debug!("dropped edge from pc {src_pc:#x} to non-JUMPDEST target {attempted_target:#x}");
        self.dropped_edges.push(DroppedEdge {
            src_pc,
            attempted_target,
        });
    }

    pub fn record_resource_limit(&mut self, limit: ResourceLimit) {
        log::warn!("resource limit hit: {limit}");
        self.resource_limits_hit.push(limit);
        self.aborted = true;
    }

    pub fn record_cancelled(&mut self) {
        log::warn!("cancellation observed; returning partial CFG");
        self.aborted = true;
    }
}
