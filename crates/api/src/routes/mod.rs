mod cards;
mod public;
mod themes;

pub use cards::card_routes;
pub use public::public_routes;
pub use themes::theme_routes;
