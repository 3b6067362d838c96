use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docgate_core::{DocumentId, Entity, IngestionId, UserId};

/// Lifecycle of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Processing,
    Completed,
    Failed,
}

impl IngestionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestionStatus::Completed | IngestionStatus::Failed)
    }
}

impl core::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IngestionStatus::Processing => f.write_str("processing"),
            IngestionStatus::Completed => f.write_str("completed"),
            IngestionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// One ingestion run. At most one exists per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingestion {
    pub id: IngestionId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub status: IngestionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingestion {
    pub fn start(document_id: DocumentId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: IngestionId::new(),
            document_id,
            user_id,
            status: IngestionStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn finish(&mut self, success: bool) {
        self.status = if success {
            IngestionStatus::Completed
        } else {
            IngestionStatus::Failed
        };
        self.updated_at = Utc::now();
    }
}

impl Entity for Ingestion {
    type Id = IngestionId;

    fn id(&self) -> IngestionId {
        self.id
    }
}
