mod feature_state;
mod holder;
mod repository;

pub use feature_state::*;
pub use holder::*;
pub use repository::*;
