use serde::Serialize;

/// Fetch state of a view's data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Error(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Record the result of a fetch, keeping the error text verbatim.
    pub fn settle<E: std::fmt::Display>(&mut self, result: Result<T, E>) {
        *self = match result {
            Ok(v) => LoadState::Ready(v),
            Err(e) => LoadState::Error(e.to_string()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_keeps_message() {
        let mut state: LoadState<u32> = LoadState::Loading;
        assert!(state.is_loading());
        state.settle(Err::<u32, _>("permission denied for view v_orders"));
        assert_eq!(state.error(), Some("permission denied for view v_orders"));
        state.settle(Ok::<_, String>(3));
        assert_eq!(state.ready(), Some(&3));
    }
}
