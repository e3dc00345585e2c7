use std::sync::Arc;

use content::{Store, StoreError};
use settings::Settings;

use crate::pages::Site;

pub struct State {
    pub store: Store,
    pub settings: Settings,
}

impl State {
    pub async fn new(settings: Settings) -> Result<Arc<Self>, StoreError> {
        let store = Store::connect(&settings.database_url).await?;

        Ok(Arc::new(Self { store, settings }))
    }

    pub fn site(&self) -> Site<'_> {
        Site {
            title: &self.settings.site_title,
            static_url: &self.settings.static_url,
        }
    }
}
