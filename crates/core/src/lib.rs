pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod search;

pub use catalog::{Catalog, CatalogError, CompatibilityReport, ModelParts, TroubleshootingReport};
pub use config::{AgentMode, AppConfig, ConfigError, LoadOptions};
pub use domain::conversation::{
    AgentResponse, ChatMessage, ChatRequest, ConversationId, Role, ValidationError,
};
pub use domain::intent::{Entities, EntityKind, Intent, IntentType};
pub use domain::product::{Category, PartNumber, Product};
pub use domain::troubleshooting::TroubleshootingGuide;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use search::{SearchBackend, SearchError, SearchService, VectorIndex};
