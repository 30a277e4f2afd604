//! Read-only home-screen widget surface.
//!
//! Renders straight from the cache store. Never talks to the story API and
//! never reads the session; the only network traffic is best-effort image
//! loading for the rows it shows.

use chrono::DateTime;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Widget};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{CacheStore, StoryRecord};
use crate::error::Error;

/// Fetches row images for the widget.
pub trait ImageLoader: Send + Sync {
  fn load(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// Loads images over HTTP
pub struct HttpImageLoader {
  http: reqwest::Client,
}

impl HttpImageLoader {
  pub fn new(timeout: Duration) -> Result<Self, Error> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;
    Ok(Self { http })
  }
}

impl ImageLoader for HttpImageLoader {
  async fn load(&self, url: &str) -> Result<Vec<u8>, Error> {
    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| Error::Network(format!("Failed to fetch image: {}", e)))?;

    if !response.status().is_success() {
      return Err(Error::Network(format!(
        "Image request failed with status {}",
        response.status().as_u16()
      )));
    }

    let bytes = response
      .bytes()
      .await
      .map_err(|e| Error::Network(format!("Failed to read image: {}", e)))?;
    Ok(bytes.to_vec())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetImage {
  Loaded(Vec<u8>),
  Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetRow {
  pub story: StoryRecord,
  pub image: WidgetImage,
}

/// Builds widget rows from the cache.
pub struct WidgetRenderer<C: CacheStore, L: ImageLoader> {
  cache: Arc<C>,
  loader: L,
  max_rows: usize,
}

impl<C: CacheStore, L: ImageLoader> WidgetRenderer<C, L> {
  pub fn new(cache: Arc<C>, loader: L, max_rows: usize) -> Self {
    Self {
      cache,
      loader,
      max_rows,
    }
  }

  /// Rows for one render request: up to `max_rows` cached stories, each with
  /// its image or a placeholder when the image cannot be loaded.
  pub async fn render(&self) -> Result<Vec<WidgetRow>, Error> {
    let records = self.cache.list_all()?;
    let mut rows = Vec::with_capacity(records.len().min(self.max_rows));

    for story in records.into_iter().take(self.max_rows) {
      let image = self.load_image(&story.photo_url).await;
      rows.push(WidgetRow { story, image });
    }

    debug!(rows = rows.len(), "Rendered widget rows");
    Ok(rows)
  }

  async fn load_image(&self, url: &str) -> WidgetImage {
    if url.is_empty() {
      return WidgetImage::Placeholder;
    }

    match self.loader.load(url).await {
      Ok(bytes) if !bytes.is_empty() => WidgetImage::Loaded(bytes),
      Ok(_) => WidgetImage::Placeholder,
      Err(e) => {
        debug!(url, error = %e, "Widget image unavailable, using placeholder");
        WidgetImage::Placeholder
      }
    }
  }
}

/// Date part of an ISO-8601 timestamp, or the raw text if it does not parse
fn display_date(created_at: &str) -> String {
  DateTime::parse_from_rfc3339(created_at)
    .map(|dt| dt.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|_| created_at.to_string())
}

fn row_item(row: &WidgetRow) -> ListItem<'_> {
  let marker = match row.image {
    WidgetImage::Loaded(_) => "■",
    WidgetImage::Placeholder => "□",
  };

  let header = Line::from(vec![
    Span::raw(format!("{} ", marker)),
    Span::styled(
      row.story.name.as_str(),
      Style::default().add_modifier(Modifier::BOLD),
    ),
    Span::raw(format!(" · {}", display_date(&row.story.created_at))),
  ]);
  let body = Line::from(format!("  {}", row.story.description));

  ListItem::new(vec![header, body])
}

/// Draw the rows as a list surface into `buf`.
pub fn draw(rows: &[WidgetRow], area: Rect, buf: &mut Buffer) {
  let items: Vec<ListItem> = rows.iter().map(row_item).collect();
  let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Stories "));
  Widget::render(list, area, buf);
}

/// Draw into an offscreen buffer and return its text lines.
pub fn render_lines(rows: &[WidgetRow], width: u16) -> Vec<String> {
  // Two lines per row plus the border
  let height = (rows.len() as u16).saturating_mul(2).saturating_add(2);
  let area = Rect::new(0, 0, width, height);
  let mut buf = Buffer::empty(area);
  draw(rows, area, &mut buf);

  (0..height)
    .map(|y| {
      let line: String = (0..width).map(|x| buf[(x, y)].symbol()).collect();
      line.trim_end().to_string()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteCacheStore;

  struct FakeLoader;

  impl ImageLoader for FakeLoader {
    async fn load(&self, url: &str) -> Result<Vec<u8>, Error> {
      if url.contains("broken") {
        Err(Error::Network("connection reset".to_string()))
      } else {
        Ok(url.as_bytes().to_vec())
      }
    }
  }

  fn record(id: &str, photo_url: &str) -> StoryRecord {
    StoryRecord {
      id: id.to_string(),
      name: format!("User {}", id),
      description: "Hello".to_string(),
      photo_url: photo_url.to_string(),
      created_at: "2024-01-01T00:00:00Z".to_string(),
      lat: None,
      lon: None,
    }
  }

  #[tokio::test]
  async fn test_empty_cache_renders_no_rows() {
    let cache = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    let renderer = WidgetRenderer::new(cache, FakeLoader, 5);
    assert!(renderer.render().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_failed_image_gets_placeholder() {
    let cache = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    cache.insert(&record("a", "http://x/a.jpg")).unwrap();
    cache.insert(&record("b", "http://x/broken.jpg")).unwrap();
    cache.insert(&record("c", "")).unwrap();

    let rows = WidgetRenderer::new(cache, FakeLoader, 5).render().await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].image, WidgetImage::Loaded(b"http://x/a.jpg".to_vec()));
    assert_eq!(rows[1].image, WidgetImage::Placeholder);
    assert_eq!(rows[2].image, WidgetImage::Placeholder);
  }

  #[tokio::test]
  async fn test_rows_capped_at_max() {
    let cache = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    for id in ["a", "b", "c", "d"] {
      cache.insert(&record(id, "http://x/a.jpg")).unwrap();
    }

    let rows = WidgetRenderer::new(cache, FakeLoader, 2).render().await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.story.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
  }

  #[test]
  fn test_render_lines_shows_name_and_date() {
    let rows = vec![WidgetRow {
      story: record("s1", "http://x/1.jpg"),
      image: WidgetImage::Placeholder,
    }];

    let lines = render_lines(&rows, 40);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("Stories"));
    assert!(lines[1].contains("□ User s1 · 2024-01-01"));
    assert!(lines[2].contains("Hello"));
  }

  #[test]
  fn test_display_date_falls_back_to_raw() {
    assert_eq!(display_date("2022-01-08T06:34:18.598Z"), "2022-01-08");
    assert_eq!(display_date("yesterday"), "yesterday");
  }
}
