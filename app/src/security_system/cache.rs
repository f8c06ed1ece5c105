use std::time::Duration;

use tokio::sync::watch;

use super::AccessoryState;

/// Last confirmed state of the security system. Empty until the first poll,
/// command or remote read succeeded, never cleared afterwards.
pub struct StateCell {
    tx: watch::Sender<Option<AccessoryState>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self) -> Option<AccessoryState> {
        *self.tx.borrow()
    }

    /// Stores the state and returns the previous value.
    pub fn set(&self, state: AccessoryState) -> Option<AccessoryState> {
        self.tx.send_replace(Some(state))
    }

    /// Waits until a value is available, for at most `timeout`.
    pub async fn wait_for_value(&self, timeout: Duration) -> Option<AccessoryState> {
        let mut rx = self.tx.subscribe();

        match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(state)) => *state,
            //sender is owned by self, so the channel can't be closed while waiting
            Ok(Err(_)) | Err(_) => self.get(),
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_set() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), None);

        assert_eq!(cell.set(AccessoryState::Disarm), None);
        assert_eq!(cell.get(), Some(AccessoryState::Disarm));

        assert_eq!(cell.set(AccessoryState::AwayArm), Some(AccessoryState::Disarm));
        assert_eq!(cell.get(), Some(AccessoryState::AwayArm));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_set() {
        let cell = StateCell::new();
        cell.set(AccessoryState::NightArm);

        let state = cell.wait_for_value(Duration::from_secs(60)).await;

        assert_eq!(state, Some(AccessoryState::NightArm));
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_timeout() {
        let cell = StateCell::new();

        let started = tokio::time::Instant::now();
        let state = cell.wait_for_value(Duration::from_millis(50)).await;

        assert_eq!(state, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_wait_wakes_up_on_first_value() {
        let cell = std::sync::Arc::new(StateCell::new());

        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.wait_for_value(Duration::from_secs(10)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cell.set(AccessoryState::AwayArm);

        assert_eq!(waiter.await.unwrap(), Some(AccessoryState::AwayArm));
    }
}
