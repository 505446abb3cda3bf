use std::time::Duration;

use tokio::time::sleep;
use tracing::trace;

use crate::gallery::LoadTicket;

/// Staged reveal: hands a load ticket back after a fixed delay so the loading
/// footer gets a chance to show. Nothing is fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLoader {
    delay: Duration,
}

impl SimulatedLoader {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Resolves once the delay has elapsed; a zero delay resolves at once.
    pub async fn load(&self, ticket: LoadTicket) -> LoadTicket {
        if !self.delay.is_zero() {
            trace!(delay_ms = self.delay.as_millis() as u64, "Staging page");
            sleep(self.delay).await;
        }
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::gallery::{Footer, Gallery, ShuffleCache};
    use crate::models::{Catalog, MediaItem, MediaSource, MediaType};
    use tokio::time::Instant;

    fn gallery(n: u32) -> Gallery {
        let items = (0..n)
            .map(|i| {
                MediaItem::new(
                    i,
                    MediaSource::Path(format!("{}.jpg", i).into()),
                    MediaType::Image,
                )
            })
            .collect();
        Gallery::with_shuffle(
            Catalog::new(items).unwrap(),
            GalleryConfig::default(),
            ShuffleCache::seeded(2),
        )
    }

    #[tokio::test]
    async fn test_zero_delay_resolves_immediately() {
        let mut gallery = gallery(30);
        let ticket = gallery.request_more().unwrap();
        let ticket = SimulatedLoader::default().load(ticket).await;
        assert!(gallery.complete_load(ticket));
        assert_eq!(gallery.visible_prefix().len(), 30);
    }

    #[tokio::test]
    async fn test_delay_keeps_loading_footer() {
        let mut gallery = gallery(30);
        let loader = SimulatedLoader::new(Duration::from_millis(20));
        let started = Instant::now();

        let ticket = gallery.request_more().unwrap();
        assert_eq!(gallery.footer(), Footer::Loading);
        let ticket = loader.load(ticket).await;
        assert!(started.elapsed() >= Duration::from_millis(20));

        assert!(gallery.complete_load(ticket));
        assert_eq!(
            gallery.footer(),
            Footer::AllLoaded {
                shown: 30,
                total: 30
            }
        );
    }

    #[tokio::test]
    async fn test_filter_change_during_delay_discards_page() {
        let mut gallery = gallery(50);
        let loader = SimulatedLoader::new(Duration::from_millis(5));
        let ticket = gallery.request_more().unwrap();
        let pending = loader.load(ticket);

        gallery.set_filter("team".into());
        let ticket = pending.await;
        assert!(!gallery.complete_load(ticket));
    }
}
