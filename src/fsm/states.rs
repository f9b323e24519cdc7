//! Activation state handlers and table builder.
//!
//! ```text
//!  IDLE ──[blower on]──▶ PENDING ──[delay elapsed & in hours]──▶ ACTIVE
//!    ▲                      │  ▲                                    │
//!    │                [blower off]└──────[outside hours]────────────┤
//!    └──────────────────────┴──────────────[blower off]─────────────┘
//!
//!  Any state ──[disabled]──▶ IDLE
//!  Any state ──[oil empty]──▶ SUPPRESSED_DEPLETED ──[oil > 0 & enabled]──▶ IDLE
//! ```

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Pending
        StateDescriptor {
            id: StateId::Pending,
            name: "Pending",
            on_enter: Some(pending_enter),
            on_exit: None,
            on_update: pending_update,
        },
        // Index 2: Active
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
        // Index 3: SuppressedDepleted
        StateDescriptor {
            id: StateId::SuppressedDepleted,
            name: "SuppressedDepleted",
            on_enter: Some(suppressed_enter),
            on_exit: Some(suppressed_exit),
            on_update: suppressed_update,
        },
    ]
}

/// Overrides shared by every state except `SuppressedDepleted`.
fn guard(ctx: &FsmContext) -> Option<StateId> {
    if ctx.inputs.oil_depleted {
        return Some(StateId::SuppressedDepleted);
    }
    if !ctx.inputs.enabled {
        return Some(StateId::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.run_diffuser = false;
    ctx.pending_since = None;
    ctx.blocked_by_hours = false;
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.inputs.oil_depleted {
        return Some(StateId::SuppressedDepleted);
    }
    if ctx.inputs.enabled && ctx.inputs.hvac_running {
        return Some(StateId::Pending);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PENDING state: blower on, waiting out the delay or the business window
// ═══════════════════════════════════════════════════════════════════════════

fn pending_enter(ctx: &mut FsmContext) {
    ctx.run_diffuser = false;
    let since = *ctx.pending_since.get_or_insert(ctx.now);
    let remaining = ctx
        .activation_delay
        .saturating_sub(ctx.now.saturating_sub(since));
    info!("PENDING: blower on, activating in {}s", remaining.as_secs());
}

fn pending_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = guard(ctx) {
        return Some(next);
    }
    if !ctx.inputs.hvac_running {
        return Some(StateId::Idle);
    }
    if !ctx.delay_elapsed() {
        return None;
    }
    if ctx.inputs.within_business_hours {
        ctx.blocked_by_hours = false;
        return Some(StateId::Active);
    }
    if !ctx.blocked_by_hours {
        ctx.blocked_by_hours = true;
        info!("PENDING: outside business hours, holding");
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state: duty-cycle driver running
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.run_diffuser = true;
    info!(
        "ACTIVE: diffuser running after {}s of blower",
        ctx.pending_elapsed().as_secs()
    );
}

fn active_exit(ctx: &mut FsmContext) {
    ctx.run_diffuser = false;
}

fn active_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = guard(ctx) {
        return Some(next);
    }
    if !ctx.inputs.hvac_running {
        return Some(StateId::Idle);
    }
    if !ctx.inputs.within_business_hours {
        info!("ACTIVE: business hours ended");
        return Some(StateId::Pending);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUPPRESSED_DEPLETED state: oil empty, outputs held off
// ═══════════════════════════════════════════════════════════════════════════

fn suppressed_enter(ctx: &mut FsmContext) {
    ctx.run_diffuser = false;
    ctx.pending_since = None;
    ctx.blocked_by_hours = false;
    warn!("SUPPRESSED: oil depleted, diffuser held off until refilled and re-enabled");
}

fn suppressed_exit(_ctx: &mut FsmContext) {
    info!("SUPPRESSED: oil replenished and system enabled, resuming");
}

fn suppressed_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.inputs.oil_depleted && ctx.inputs.enabled {
        return Some(StateId::Idle);
    }
    None
}
