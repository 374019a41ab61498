/// Stages of the card-creation saga. Only the row-and-items stage is
/// compensated (delete-on-failure); image and QR failures leave the card
/// persisted because those artifacts are cheaply regenerable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    Validating,
    RowCreated,
    ItemsPending,
    ItemsOk,
    ItemsFailed,
    CompensatingDelete,
    ImagesPending,
    QrPending,
    Complete,
    /// QR generation failed after commit; the card is still usable and a
    /// later RegenerateQr repairs it.
    CompleteWithoutQr,
    Failed,
}

impl CreateStage {
    pub fn can_advance_to(self, next: CreateStage) -> bool {
        use CreateStage::*;
        matches!(
            (self, next),
            (Validating, RowCreated)
                | (RowCreated, ItemsPending)
                | (ItemsPending, ItemsOk)
                | (ItemsPending, ItemsFailed)
                | (ItemsFailed, CompensatingDelete)
                | (CompensatingDelete, Failed)
                | (ItemsOk, ImagesPending)
                | (ImagesPending, QrPending)
                | (QrPending, Complete)
                | (QrPending, CompleteWithoutQr)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CreateStage::Complete | CreateStage::CompleteWithoutQr | CreateStage::Failed
        )
    }
}

/// Tracks a Create invocation through its stages so each transition (and its
/// compensating action) is explicit instead of exception-driven cleanup.
#[derive(Debug)]
pub struct CreateSaga {
    stage: CreateStage,
}

impl CreateSaga {
    pub fn new() -> Self {
        Self {
            stage: CreateStage::Validating,
        }
    }

    pub fn stage(&self) -> CreateStage {
        self.stage
    }

    pub fn advance(&mut self, next: CreateStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal saga transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!("[CreateSaga] {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

impl Default for CreateSaga {
    fn default() -> Self {
        Self::new()
    }
}
