mod storage;
mod store;
mod types;

pub use storage::SessionStorage;
pub use store::ConversationHistoryStore;
pub use types::*;
