//! Shared helpers for the behavioral specs

use kelp_core::{Message, MessageSchema};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u32,
}

impl Message for Job {
    fn schema() -> MessageSchema {
        MessageSchema::new("job")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub body: String,
}

impl Message for Note {
    fn schema() -> MessageSchema {
        MessageSchema::new("note")
    }
}

/// Poll until `check` holds; panics after five (virtual) seconds
pub async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
