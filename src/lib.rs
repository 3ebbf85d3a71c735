//! pageseg: layout segment extraction
//!
//! Extracts reusable visual segments (header, navbar, sidebar, main, gallery,
//! footer) from a rendered web page. Segment content is stripped of anything
//! proprietary (real text, real images, scripts, event handlers) and returned
//! as self-contained markup plus its on-page rectangle, so segments from
//! unrelated pages can later be recombined into a synthetic layout.
//!
//! # Features
//!
//! - **Engine**: script removal, media placeholders, role detection with a
//!   geometric MAIN fallback, text anonymization, style flattening
//! - **Host-agnostic**: the engine runs against the [`dom::LiveDom`]
//!   capability trait; [`dom::Document`] is the bundled in-process host
//! - **Page host** (`fetch` feature): fetch a URL and segment it
//! - **HTTP server** (`server` feature): `POST /segment` endpoint
//!
//! # Example
//!
//! ```
//! use pageseg::{HostConfig, PageHost};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let host = PageHost::new(HostConfig::default())?;
//! let response = host.segment_html(
//!     "<html><body><header><h1>Acme Corp</h1></header><main><p>Hi</p></main></body></html>",
//! )?;
//! assert_eq!(response.segments.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

pub mod error;
pub use error::{ErrorBody, Error, Result};

// Arena DOM, selector engine and the `LiveDom` capability trait
pub mod dom;

// Cascade, computed style and flow layout backing `dom::Document`
pub mod rendering;

// The segmentation & sanitization engine
pub mod segment;

// Page host: runs the engine against parsed or fetched documents
pub mod host;

#[cfg(feature = "server")]
pub mod server;

pub use host::{PageHost, SegmentResponse};
pub use segment::{Role, Segment, SegmentMessage, SegmentRect};

/// Configuration for the page host
///
/// Defaults mirror a desktop browser: a 1280x800 viewport, a Chrome user
/// agent, English `Accept-Language` and a one minute navigation timeout.
///
/// # Examples
///
/// ```
/// let cfg = pageseg::HostConfig::default();
/// assert_eq!(cfg.viewport.width, 1280);
/// assert_eq!(cfg.timeout_ms, 60_000);
/// ```
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions used for layout
    pub viewport: Viewport,
    /// Navigation timeout in milliseconds
    pub timeout_ms: u64,
    /// Extra HTTP headers
    pub headers: HashMap<String, String>,
    /// Re-query segment markers after the engine runs and return the hits
    pub reextract_marked: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
            viewport: Viewport::default(),
            timeout_ms: 60_000,
            headers,
            reextract_marked: false,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

impl std::str::FromStr for Viewport {
    type Err = Error;

    /// Parse `WIDTHxHEIGHT`, e.g. `1280x800`.
    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::ConfigError(format!("viewport must be WIDTHxHEIGHT, got '{}'", s)))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::ConfigError(format!("bad viewport width '{}': {}", w, e)))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::ConfigError(format!("bad viewport height '{}': {}", h, e)))?;
        if width == 0 || height == 0 {
            return Err(Error::ConfigError("viewport dimensions must be non-zero".into()));
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 800);
        assert!(config.user_agent.contains("Chrome"));
        assert_eq!(
            config.headers.get("Accept-Language").map(String::as_str),
            Some("en-US,en;q=0.9")
        );
    }

    #[test]
    fn test_viewport_from_str() {
        let viewport: Viewport = "1920x1080".parse().unwrap();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);

        assert!("1920".parse::<Viewport>().is_err());
        assert!("0x10".parse::<Viewport>().is_err());
        assert!("axb".parse::<Viewport>().is_err());
    }
}
