use super::{Config, Demo, Group, Logs, UnionBox};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        threadunion: UnionBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            group: Group {
                name: "test-union".to_string(),
                join_poll: Some(Duration::from_millis(5)),
            },
            demo: Demo {
                workers: 4,
                fail_every: 2,
                task_duration: Some(Duration::from_millis(50)),
                run_for: Some(Duration::from_millis(100)),
                shutdown_timeout: Some(Duration::from_secs(5)),
            },
        },
    }
}
