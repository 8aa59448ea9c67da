//! Exclusive controller ownership
//!
//! A TWI controller is process-wide hardware state. Chip support code keeps
//! one [`ControllerClaim`] per physical controller in a `static`; a bus
//! handle holds the resulting [`ClaimGuard`] for its whole lifetime, so a
//! second handle aliasing the same controller is refused at construction
//! instead of silently interleaving transactions.
//!
//! On cores without compare-and-swap (thumbv6m and similar) enable the
//! `critical-section` feature and link a critical-section implementation.

use portable_atomic::{AtomicBool, Ordering};

/// Claim flag for one physical controller
///
/// # Example
/// ```
/// use twinwire_hal::ControllerClaim;
///
/// static TWI0: ControllerClaim = ControllerClaim::new();
///
/// let guard = TWI0.try_claim().unwrap();
/// assert!(TWI0.try_claim().is_none());
/// drop(guard);
/// assert!(TWI0.try_claim().is_some());
/// ```
#[derive(Debug)]
pub struct ControllerClaim {
    taken: AtomicBool,
}

impl Default for ControllerClaim {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerClaim {
    /// Create an unclaimed flag
    pub const fn new() -> Self {
        Self {
            taken: AtomicBool::new(false),
        }
    }

    /// Claim the controller
    ///
    /// Returns `None` if a [`ClaimGuard`] for this controller is alive.
    pub fn try_claim(&'static self) -> Option<ClaimGuard> {
        if self.taken.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(ClaimGuard { claim: self })
        }
    }

    /// Check if the controller is currently claimed
    pub fn is_claimed(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

/// Proof of exclusive ownership; releases the claim on drop
#[derive(Debug)]
pub struct ClaimGuard {
    claim: &'static ControllerClaim,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.claim.taken.store(false, Ordering::Release);
    }
}
