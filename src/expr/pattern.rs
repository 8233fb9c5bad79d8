//! Path patterns: the leaves of a path expression.

use std::fmt;

use smallvec::SmallVec;

use super::Glob;
use crate::util::ScenePath;

/// One step of a pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Exactly one prim whose name matches the glob.
    Name(Glob),
    /// Zero or more prims (`//`).
    Descend,
}

/// A path pattern such as `/World/*/Key*`, `//Light*`, `/World//` or
/// `Geo/*.visibility`.
#[derive(Clone, Debug, PartialEq)]
pub struct PathPattern {
    absolute: bool,
    segments: SmallVec<[Segment; 4]>,
    property: Option<Glob>,
}

fn match_segments(segments: &[Segment], components: &[&str]) -> bool {
    match segments.split_first() {
        None => components.is_empty(),
        Some((Segment::Descend, rest)) => {
            (0..=components.len()).any(|skip| match_segments(rest, &components[skip..]))
        }
        Some((Segment::Name(glob), rest)) => match components.split_first() {
            Some((first, tail)) => glob.matches(first) && match_segments(rest, tail),
            None => false,
        },
    }
}

impl PathPattern {
    pub(crate) fn new(absolute: bool, segments: SmallVec<[Segment; 4]>, property: Option<Glob>) -> Self {
        Self {
            absolute,
            segments,
            property,
        }
    }

    /// `//`: every prim.
    pub fn everything() -> Self {
        let mut segments = SmallVec::new();
        segments.push(Segment::Descend);
        Self::new(true, segments, None)
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn property(&self) -> Option<&Glob> {
        self.property.as_ref()
    }

    /// Anchor a relative pattern at `anchor`. Absolute patterns are unchanged.
    pub fn make_absolute(&self, anchor: &ScenePath) -> PathPattern {
        if self.absolute {
            return self.clone();
        }
        let mut segments: SmallVec<[Segment; 4]> = anchor
            .components()
            .map(|name| Segment::Name(Glob::literal(name)))
            .collect();
        segments.extend(self.segments.iter().cloned());
        Self::new(true, segments, self.property.clone())
    }

    /// Test a path. Relative patterns behave as if anchored at the root.
    ///
    /// Patterns without a property part only match prim paths (and the
    /// pseudo-root); patterns with one only match property paths.
    pub fn matches(&self, path: &ScenePath) -> bool {
        let components: SmallVec<[&str; 8]> = path.components().collect();
        match (&self.property, path.property_name()) {
            (None, None) => match_segments(&self.segments, &components),
            (Some(glob), Some(name)) => {
                glob.matches(name) && match_segments(&self.segments, &components)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if self.absolute {
            out.push('/');
        }
        let mut prev_name = false;
        for segment in &self.segments {
            match segment {
                Segment::Name(glob) => {
                    if prev_name {
                        out.push('/');
                    }
                    out.push_str(glob.as_str());
                    prev_name = true;
                }
                Segment::Descend => {
                    if out.ends_with('/') {
                        out.push('/');
                    } else {
                        out.push_str("//");
                    }
                    prev_name = false;
                }
            }
        }
        if let Some(prop) = &self.property {
            out.push('.');
            out.push_str(prop.as_str());
        }
        f.write_str(&out)
    }
}
