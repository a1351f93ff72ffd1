//! Suppression of repeated corrective actions.

use tandem_core::SyncAction;

/// Remembers the last dispatched action until the inputs converge.
///
/// A divergence is reported by every notification that carries it: a
/// redundant disk notification or a remote re-emission would otherwise fire
/// the same upload again. The gate admits an action once and suppresses
/// identical ones until a pass decides no action at all.
#[derive(Debug)]
pub(crate) struct ActionGate<T> {
    last: Option<SyncAction<T>>,
    enabled: bool,
}

impl<T: Clone + PartialEq> ActionGate<T> {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            last: None,
            enabled,
        }
    }

    /// Returns true if `decided` should be dispatched.
    pub(crate) fn admit(&mut self, decided: Option<&SyncAction<T>>) -> bool {
        let Some(action) = decided else {
            self.last = None;
            return false;
        };
        if self.enabled && self.last.as_ref() == Some(action) {
            return false;
        }
        self.last = Some(action.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_action_is_admitted_once() {
        let mut gate = ActionGate::new(true);
        let upload = SyncAction::UploadRemote(7u32);

        assert!(gate.admit(Some(&upload)));
        assert!(!gate.admit(Some(&upload)));
        assert!(!gate.admit(Some(&upload)));
    }

    #[test]
    fn convergence_clears_the_gate() {
        let mut gate = ActionGate::new(true);
        let upload = SyncAction::UploadRemote(7u32);

        assert!(gate.admit(Some(&upload)));
        assert!(!gate.admit(None));
        assert!(gate.admit(Some(&upload)));
    }

    #[test]
    fn different_action_is_admitted() {
        let mut gate = ActionGate::new(true);
        assert!(gate.admit(Some(&SyncAction::UploadRemote(7u32))));
        assert!(gate.admit(Some(&SyncAction::UploadRemote(8u32))));
        assert!(gate.admit(Some(&SyncAction::UpsertLocal(8u32))));
    }

    #[test]
    fn disabled_gate_admits_everything() {
        let mut gate = ActionGate::new(false);
        let create = SyncAction::<u32>::CreateDefault;
        assert!(gate.admit(Some(&create)));
        assert!(gate.admit(Some(&create)));
    }
}
