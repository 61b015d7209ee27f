pub mod api;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod model;
pub mod poll;
pub mod scrape;
pub mod surface;

pub use error::BalanceError;
pub use fetcher::BalanceFetcher;
pub use model::{AccountBalance, FetchStrategy, PayAsYouGoBalance, SubscriptionBalance};
pub use surface::{HttpPage, PageSurface, SurfaceError};
