pub mod migrations;
pub mod settings;
pub mod store;
pub mod widget;

pub use settings::AppSettings;
pub use store::{SharedStore, StoreError};
pub use widget::WidgetSnapshot;
