mod card;
mod card_image;
mod card_item;
mod error;
mod input;
mod items;
mod normalize;
mod response;
mod saga;
mod service;

pub use card::Card;
pub use card_image::CardImage;
pub use card_item::CardItem;
pub use error::{CardError, FieldErrors};
pub use input::{CardInput, ItemInput, QrInput};
pub use items::{ItemOutcome, ItemSynchronizer, SyncError, SyncPlan, plan_sync, validate_item};
pub use normalize::{normalize_color, normalize_theme, slugify, validate_name, MAX_NAME_LEN};
pub use response::CardResponse;
pub use saga::{CreateSaga, CreateStage};
pub use service::{CardAggregate, CardAggregateService};
