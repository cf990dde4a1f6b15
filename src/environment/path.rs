use std::fmt;

/// Dot-separated address of a marker (`navigator.camera.getPicture`).
///
/// Segments are kept verbatim: an empty segment (`a..b`) is preserved and can
/// never match a child, so latch clauses containing one are never satisfied.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MarkerPath {
    segments: Vec<String>,
}

impl MarkerPath {
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn split_last(&self) -> Option<(&str, &[String])> {
        let (last, parents) = self.segments.split_last()?;
        Some((last.as_str(), parents))
    }
}

impl fmt::Display for MarkerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
