use papersum_core::Theme;
use tracing::{info, warn};

use crate::settings::{keys, SettingsService};
use crate::store::Result;

/// The client's persisted session: auth token and theme preference
#[derive(Clone)]
pub struct SessionService {
    settings: SettingsService,
}

impl SessionService {
    pub fn new(settings: SettingsService) -> Self {
        Self { settings }
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .settings
            .get(keys::AUTH_TOKEN)?
            .filter(|t| !t.trim().is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.settings.set(keys::AUTH_TOKEN, token)?;
        info!("Auth token stored");
        Ok(())
    }

    pub fn clear_token(&self) -> Result<()> {
        self.settings.delete(keys::AUTH_TOKEN)?;
        info!("Auth token cleared");
        Ok(())
    }

    /// Stored theme, falling back to the default when unset or unreadable
    pub fn theme(&self) -> Result<Theme> {
        let Some(raw) = self.settings.get(keys::THEME)? else {
            return Ok(Theme::default());
        };
        Ok(raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "Ignoring unknown stored theme");
            Theme::default()
        }))
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.settings.set(keys::THEME, theme.as_str())
    }
}
