//! Model identification and token budgets.

mod model_spec;
mod token_limits;

pub use model_spec::ModelSpec;
pub use model_spec::ModelSpecParseError;
pub use token_limits::DEFAULT_TOKEN_LIMIT;
pub use token_limits::TokenLimitTable;
