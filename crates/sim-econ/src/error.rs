use thiserror::Error;

/// Reasons a player action is refused. The engine folds these into `false`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error("unknown administration: {0}")]
    UnknownAdministration(String),
    #[error("unknown agent {agent} in {administration}")]
    UnknownAgent { administration: String, agent: String },
    #[error("administration {0} is locked")]
    AdministrationLocked(String),
    #[error("administration {0} is already unlocked")]
    AlreadyUnlocked(String),
    /// `max_owned` reached for this agent.
    #[error("agent {agent} is capped at {max}")]
    MaxOwned { agent: String, max: u32 },
    #[error("insufficient resources")]
    Unaffordable,
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    #[error("upgrade {0} already purchased")]
    AlreadyPurchased(String),
    #[error("upgrade requires {0}")]
    MissingPrerequisite(String),
    #[error("conformité is not unlocked")]
    ConformiteLocked,
    #[error("conformité is already activated")]
    AlreadyActivated,
    #[error("conformité is already complete")]
    ConformiteComplete,
    /// Action repeated inside its debounce window.
    #[error("action debounced")]
    Debounced,
    #[error("not enough paperclips: need {needed}, have {held}")]
    InsufficientPaperclips { needed: u64, held: u64 },
    #[error("prestige reward is zero")]
    NotEligible,
    #[error("a prestige reset is in progress")]
    PrestigeInProgress,
}
