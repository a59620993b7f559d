/*
    playlist-transfer-rs | Rust CLI tool to copy Spotify playlists to YouTube.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::models::{PlaylistEntry, PlaylistRef};
use crate::platform::{BearerToken, CatalogPage, PlatformError, SourcePlatform};
use futures::stream::{self, Stream, TryStreamExt};
use log::debug;
use std::sync::Arc;

/// Items requested per playlist-items call.
pub const TRACK_PAGE_SIZE: u32 = 100;
/// Items requested per user-playlists call.
pub const PLAYLIST_PAGE_SIZE: u32 = 50;

/// Offset cursor over a listing whose total is learned from the first page.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    offset: u32,
    total: Option<u32>,
}

impl Cursor {
    fn is_exhausted(&self) -> bool {
        self.total.is_some_and(|total| self.offset >= total)
    }

    fn advance<T>(self, page: &CatalogPage<T>) -> Result<Self, PlatformError> {
        let total = self.total.unwrap_or(page.total);
        if page.items.is_empty() && self.offset < total {
            return Err(PlatformError::transport(format!(
                "empty page at offset {} before reported total {}",
                self.offset, total
            )));
        }
        Ok(Self {
            offset: self.offset + page.items.len() as u32,
            total: Some(total),
        })
    }
}

/// Reads playlists and their entries from the source platform.
pub struct SourceCatalog<S> {
    source: Arc<S>,
}

impl<S: SourcePlatform> SourceCatalog<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Lazily pages through the user's playlists. Calling it again restarts
    /// from the first page.
    pub fn playlist_pages<'a>(
        &'a self,
        credential: &'a BearerToken,
    ) -> impl Stream<Item = Result<Vec<PlaylistRef>, PlatformError>> + 'a {
        stream::try_unfold(Cursor::default(), move |cursor| async move {
            if cursor.is_exhausted() {
                return Ok::<_, PlatformError>(None);
            }
            let page = self
                .source
                .playlists_page(credential, cursor.offset, PLAYLIST_PAGE_SIZE)
                .await?;
            let next = cursor.advance(&page)?;
            Ok(Some((page.items, next)))
        })
    }

    /// Lazily pages through a playlist's entries in source order.
    pub fn track_pages<'a>(
        &'a self,
        credential: &'a BearerToken,
        playlist_id: &'a str,
    ) -> impl Stream<Item = Result<Vec<PlaylistEntry>, PlatformError>> + 'a {
        stream::try_unfold(Cursor::default(), move |cursor| async move {
            if cursor.is_exhausted() {
                return Ok::<_, PlatformError>(None);
            }
            let page = self
                .source
                .tracks_page(credential, playlist_id, cursor.offset, TRACK_PAGE_SIZE)
                .await?;
            debug!(
                "Fetched {} entries of playlist {} at offset {} (total {})",
                page.items.len(),
                playlist_id,
                cursor.offset,
                page.total
            );
            let next = cursor.advance(&page)?;
            Ok(Some((page.items, next)))
        })
    }

    pub async fn list_playlists(
        &self,
        credential: &BearerToken,
    ) -> Result<Vec<PlaylistRef>, PlatformError> {
        self.playlist_pages(credential).try_concat().await
    }

    /// Fetches every entry of a playlist. A failure on any page fails the
    /// whole call; partial listings are never returned.
    pub async fn list_tracks(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
    ) -> Result<Vec<PlaylistEntry>, PlatformError> {
        self.track_pages(credential, playlist_id).try_concat().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use crate::platform::MockSourcePlatform;

    fn entries(offset: u32, count: u32) -> Vec<PlaylistEntry> {
        (offset..offset + count)
            .map(|i| {
                Some(Track {
                    title: format!("Song {}", i),
                    artists: vec!["Artist".to_string()],
                    source_id: format!("id{}", i),
                })
            })
            .collect()
    }

    fn page_of(total: u32, offset: u32, limit: u32) -> CatalogPage<PlaylistEntry> {
        let count = total.saturating_sub(offset).min(limit);
        CatalogPage {
            items: entries(offset, count),
            total,
        }
    }

    #[tokio::test]
    async fn test_list_tracks_paginates_until_total() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_tracks_page()
            .times(3)
            .returning(|_, _, offset, limit| Ok(page_of(250, offset, limit)));

        let catalog = SourceCatalog::new(Arc::new(source));
        let tracks = catalog
            .list_tracks(&BearerToken::new("t"), "pl")
            .await
            .unwrap();

        assert_eq!(tracks.len(), 250);
        assert_eq!(tracks[249].as_ref().unwrap().title, "Song 249");
    }

    #[tokio::test]
    async fn test_list_tracks_fails_entirely_when_a_page_fails() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_tracks_page()
            .times(2)
            .returning(|_, _, offset, limit| {
                if offset == 0 {
                    Ok(page_of(250, offset, limit))
                } else {
                    Err(PlatformError::from_source_status(502, "bad gateway".to_string()))
                }
            });

        let catalog = SourceCatalog::new(Arc::new(source));
        let result = catalog.list_tracks(&BearerToken::new("t"), "pl").await;

        assert!(matches!(
            result,
            Err(PlatformError::Upstream { status: Some(502), .. })
        ));
    }

    #[tokio::test]
    async fn test_list_tracks_keeps_unavailable_entries() {
        let mut source = MockSourcePlatform::new();
        source.expect_tracks_page().times(1).returning(|_, _, _, _| {
            Ok(CatalogPage {
                items: vec![entries(0, 1).remove(0), None],
                total: 2,
            })
        });

        let catalog = SourceCatalog::new(Arc::new(source));
        let tracks = catalog
            .list_tracks(&BearerToken::new("t"), "pl")
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert!(tracks[1].is_none());
    }

    #[tokio::test]
    async fn test_list_tracks_rejects_short_listing() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_tracks_page()
            .times(2)
            .returning(|_, _, offset, _| {
                let items = if offset == 0 { entries(0, 100) } else { Vec::new() };
                Ok(CatalogPage { items, total: 150 })
            });

        let catalog = SourceCatalog::new(Arc::new(source));
        let result = catalog.list_tracks(&BearerToken::new("t"), "pl").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_playlist_issues_single_request() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_tracks_page()
            .times(1)
            .returning(|_, _, _, _| Ok(CatalogPage { items: Vec::new(), total: 0 }));

        let catalog = SourceCatalog::new(Arc::new(source));
        let tracks = catalog
            .list_tracks(&BearerToken::new("t"), "pl")
            .await
            .unwrap();

        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_list_playlists_auth_error_is_not_retried() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_playlists_page()
            .times(1)
            .returning(|_, _, _| Err(PlatformError::Auth));

        let catalog = SourceCatalog::new(Arc::new(source));
        let result = catalog.list_playlists(&BearerToken::new("expired")).await;

        assert_eq!(result, Err(PlatformError::Auth));
    }
}
