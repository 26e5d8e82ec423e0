// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid dispatcher config: {0}")]
    InvalidConfig(String),

    #[error("dispatcher is shutting down")]
    AlreadyShuttingDown,

    /// A previous flush panicked inside the processor and left the batch state poisoned.
    #[error("batch processor panicked during a flush")]
    ProcessorPanicked,
}
