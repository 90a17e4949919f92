//! Session configuration.

/// Configuration for a collaborative editing session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Room to join. `None` asks the authority to create a new one.
    pub room_id: Option<String>,
    /// Capacity of the session event channel.
    pub event_capacity: usize,
    /// Remember and re-map selections reported by other replicas.
    pub track_remote_selections: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_id: None,
            event_capacity: 100,
            track_remote_selections: true,
        }
    }
}

/// Builder for session configuration.
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn room_id(mut self, room_id: impl Into<String>) -> Self {
        self.config.room_id = Some(room_id.into());
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn track_remote_selections(mut self, enabled: bool) -> Self {
        self.config.track_remote_selections = enabled;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfigBuilder::new()
            .room_id("notes")
            .event_capacity(0)
            .track_remote_selections(false)
            .build();

        assert_eq!(config.room_id.as_deref(), Some("notes"));
        assert_eq!(config.event_capacity, 1);
        assert!(!config.track_remote_selections);
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.room_id.is_none());
        assert_eq!(config.event_capacity, 100);
        assert!(config.track_remote_selections);
    }
}
