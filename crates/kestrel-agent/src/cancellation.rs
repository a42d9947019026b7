//! Cancellation controller: routes an operator interrupt to whichever
//! suspension point is currently active.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What an interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The pending terminal read was cancelled
    InputCancelled,
    /// The in-flight turn was cancelled
    ModelCallCancelled,
    /// The exit confirmation was pending; the process should terminate now
    ForceExit,
    /// Nothing was waiting
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Input,
    ModelCall,
}

#[derive(Debug)]
struct ActiveToken {
    id: u64,
    token: CancellationToken,
    confirming: bool,
}

#[derive(Debug, Default)]
struct Slots {
    next_id: u64,
    input: Option<ActiveToken>,
    model_call: Option<ActiveToken>,
}

impl Slots {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<ActiveToken> {
        match slot {
            Slot::Input => &mut self.input,
            Slot::ModelCall => &mut self.model_call,
        }
    }
}

/// A cloneable handle shared between the agent and the signal listener.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct CancellationController {
    slots: Arc<Mutex<Slots>>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fresh token for a terminal read. The token stays active until
    /// the returned guard is dropped.
    pub fn begin_input(&self) -> ScopedToken {
        self.begin(Slot::Input, false)
    }

    /// Arm a token for the exit confirmation prompt. An interrupt while this
    /// is active yields [`Interrupt::ForceExit`].
    pub fn begin_confirmation(&self) -> ScopedToken {
        self.begin(Slot::Input, true)
    }

    /// Arm a token covering one turn's model calls and tool dispatch
    pub fn begin_model_call(&self) -> ScopedToken {
        self.begin(Slot::ModelCall, false)
    }

    fn begin(&self, slot: Slot, confirming: bool) -> ScopedToken {
        let token = CancellationToken::new();
        let mut slots = self.slots.lock();
        slots.next_id += 1;
        let id = slots.next_id;
        *slots.slot_mut(slot) = Some(ActiveToken {
            id,
            token: token.clone(),
            confirming,
        });
        ScopedToken {
            slots: Arc::clone(&self.slots),
            slot,
            id,
            token,
        }
    }

    /// Deliver one operator interrupt
    pub fn interrupt(&self) -> Interrupt {
        let slots = self.slots.lock();

        if let Some(input) = &slots.input {
            if input.confirming {
                return Interrupt::ForceExit;
            }
            input.token.cancel();
            return Interrupt::InputCancelled;
        }

        if let Some(call) = &slots.model_call {
            call.token.cancel();
            return Interrupt::ModelCallCancelled;
        }

        Interrupt::Ignored
    }
}

/// An armed cancellation token. Dropping it disarms the slot it occupies.
#[derive(Debug)]
pub struct ScopedToken {
    slots: Arc<Mutex<Slots>>,
    slot: Slot,
    id: u64,
    token: CancellationToken,
}

impl ScopedToken {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScopedToken {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        let entry = slots.slot_mut(self.slot);
        if entry.as_ref().is_some_and(|active| active.id == self.id) {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_with_nothing_active() {
        let controller = CancellationController::new();
        assert_eq!(controller.interrupt(), Interrupt::Ignored);
    }

    #[test]
    fn test_interrupt_cancels_input() {
        let controller = CancellationController::new();
        let guard = controller.begin_input();
        assert_eq!(controller.interrupt(), Interrupt::InputCancelled);
        assert!(guard.is_cancelled());
    }

    #[test]
    fn test_interrupt_cancels_model_call() {
        let controller = CancellationController::new();
        let guard = controller.begin_model_call();
        let token = guard.token();
        assert_eq!(controller.interrupt(), Interrupt::ModelCallCancelled);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_interrupt_during_confirmation_forces_exit() {
        let controller = CancellationController::new();
        let guard = controller.begin_confirmation();
        assert_eq!(controller.interrupt(), Interrupt::ForceExit);
        assert!(!guard.is_cancelled());
    }

    #[test]
    fn test_dropping_guard_disarms_slot() {
        let controller = CancellationController::new();
        let guard = controller.begin_model_call();
        drop(guard);
        assert_eq!(controller.interrupt(), Interrupt::Ignored);
    }

    #[test]
    fn test_stale_guard_does_not_clear_newer_token() {
        let controller = CancellationController::new();
        let old = controller.begin_input();
        let new = controller.begin_input();
        drop(old);
        assert_eq!(controller.interrupt(), Interrupt::InputCancelled);
        assert!(new.is_cancelled());
    }

    #[test]
    fn test_tokens_are_fresh_per_scope() {
        let controller = CancellationController::new();
        {
            let _guard = controller.begin_model_call();
            controller.interrupt();
        }
        let next = controller.begin_model_call();
        assert!(!next.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let controller = CancellationController::new();
        let listener = controller.clone();
        let guard = controller.begin_input();
        assert_eq!(listener.interrupt(), Interrupt::InputCancelled);
        assert!(guard.is_cancelled());
    }
}
