//! Status enums and the concept-status derivation rule

use serde::{Deserialize, Serialize};

/// Lifecycle status of a generation task
///
/// Terminal statuses are absorbing: once a task reaches one of
/// `completed`, `partial_failure`, `failed` or `cancelled` it never
/// changes again (failed/cancelled runs are re-submitted as new tasks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    HumanReviewPending,
    Completed,
    PartialFailure,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::HumanReviewPending => "human_review_pending",
            TaskStatus::Completed => "completed",
            TaskStatus::PartialFailure => "partial_failure",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "human_review_pending" => Some(TaskStatus::HumanReviewPending),
            "completed" => Some(TaskStatus::Completed),
            "partial_failure" => Some(TaskStatus::PartialFailure),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status is absorbing
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::PartialFailure
                | TaskStatus::Failed
                | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one generated artifact (tutorial, resources or quiz)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl PieceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceStatus::Pending => "pending",
            PieceStatus::Generating => "generating",
            PieceStatus::Completed => "completed",
            PieceStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PieceStatus::Pending),
            "generating" => Some(PieceStatus::Generating),
            "completed" => Some(PieceStatus::Completed),
            "failed" => Some(PieceStatus::Failed),
            _ => None,
        }
    }
}

/// Derived status over a concept's three artifact statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Generating,
    Completed,
    PartialFailed,
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Pending => "pending",
            OverallStatus::Generating => "generating",
            OverallStatus::Completed => "completed",
            OverallStatus::PartialFailed => "partial_failed",
            OverallStatus::Failed => "failed",
        }
    }

    /// The derivation rule:
    /// completed iff all three are completed; failed iff all three are
    /// failed; partial_failed iff at least one completed and at least one
    /// failed; otherwise generating if any is generating, else pending.
    pub fn derive(content: PieceStatus, resources: PieceStatus, quiz: PieceStatus) -> Self {
        let pieces = [content, resources, quiz];
        let completed = pieces.iter().filter(|p| **p == PieceStatus::Completed).count();
        let failed = pieces.iter().filter(|p| **p == PieceStatus::Failed).count();

        if completed == 3 {
            OverallStatus::Completed
        } else if failed == 3 {
            OverallStatus::Failed
        } else if completed >= 1 && failed >= 1 {
            OverallStatus::PartialFailed
        } else if pieces.iter().any(|p| *p == PieceStatus::Generating) {
            OverallStatus::Generating
        } else {
            OverallStatus::Pending
        }
    }
}

/// What triggered a roadmap edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditSource {
    ValidationFailed,
    HumanReview,
}

impl EditSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditSource::ValidationFailed => "validation_failed",
            EditSource::HumanReview => "human_review",
        }
    }
}

/// Outcome of a human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Modify,
}

/// One of the three per-concept artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Tutorial,
    Resources,
    Quiz,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Tutorial => "tutorial",
            ContentKind::Resources => "resources",
            ContentKind::Quiz => "quiz",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tutorial" => Some(ContentKind::Tutorial),
            "resources" => Some(ContentKind::Resources),
            "quiz" => Some(ContentKind::Quiz),
            _ => None,
        }
    }
}
