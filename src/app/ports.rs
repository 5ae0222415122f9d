use crate::error::Result;

/// Source of raw page content for the extractor.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Serves a fixed document regardless of URL. Useful for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub body: String,
}

impl StaticPage {
    pub fn new<S: Into<String>>(body: S) -> Self {
        Self { body: body.into() }
    }
}

impl PageSource for StaticPage {
    fn fetch(&self, _url: &str) -> Result<String> {
        Ok(self.body.clone())
    }
}
