use super::reconciler::Reconciler;
use crate::domain::outcome::FlowState;
use crate::domain::redirect::RedirectParams;
use crate::error::{ReconcileError, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A reconciliation running in the background, typically owned by whatever
/// renders the payment result.
///
/// The current state is observable through a watch channel. Dropping the handle
/// cancels the polling loop, so a caller that goes away never leaves a timer
/// behind.
pub struct PollHandle {
    cancel: CancellationToken,
    state: watch::Receiver<FlowState>,
    task: Option<JoinHandle<FlowState>>,
}

impl PollHandle {
    pub fn spawn(reconciler: Reconciler, params: RedirectParams) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(FlowState::Loading);

        let token = cancel.clone();
        let task = tokio::spawn(async move { reconciler.drive(&params, &token, Some(&tx)).await });

        Self {
            cancel,
            state: rx,
            task: Some(task),
        }
    }

    /// Latest published state.
    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `predicate` and returns it.
    ///
    /// Returns the final state if the task ends first.
    pub async fn wait_for(&mut self, predicate: impl Fn(&FlowState) -> bool) -> FlowState {
        let waited = match self.state.wait_for(|state| predicate(state)).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        waited.unwrap_or_else(|| self.state())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the reconciliation to end and returns its final state.
    pub async fn join(mut self) -> Result<FlowState> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| ReconcileError::InternalError(Box::new(e))),
            None => Ok(self.state()),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
