mod middleware;
mod response;
mod routes;
mod state;
mod utils;

pub use routes::{card_routes, public_routes, theme_routes};

pub use middleware::{authenticate_owner, OWNER_ID_HEADER};
pub use response::{AppError, AppSuccess, GenericResponse};
pub use state::AppState;
pub use utils::setup_tracing;
