use tracing::{debug, warn};

use crate::output::UplinkOutput;
use crate::payload::{DecodeError, Layout, LayoutError, LayoutId, decode};

/// Named, validated layouts available to a decoding host.
///
/// Lookup by name is case-insensitive. Lookup by length returns the first
/// registered layout of that length, so registration order decides between
/// layouts that share a size (`a` wins over `b` among the built-ins).
///
/// # Examples
/// ```
/// use sensorlink_core::LayoutRegistry;
///
/// let registry = LayoutRegistry::builtin()?;
/// assert_eq!(registry.for_len(16).map(|l| l.name()), Some("d"));
/// assert!(registry.get("B").is_some());
/// # Ok::<(), sensorlink_core::LayoutError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: Vec<Layout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in layouts `a` through `d`.
    ///
    /// # Errors
    /// Returns `LayoutError` if a built-in definition fails validation.
    pub fn builtin() -> Result<Self, LayoutError> {
        let mut registry = Self::new();
        for id in LayoutId::ALL {
            registry.insert(Layout::builtin(id)?);
        }
        Ok(registry)
    }

    /// Add a layout, replacing any existing layout with the same name in place.
    pub fn insert(&mut self, layout: Layout) -> Option<Layout> {
        match self.position(layout.name()) {
            Some(index) => {
                warn!(layout = layout.name(), "replacing registered layout");
                Some(std::mem::replace(&mut self.layouts[index], layout))
            }
            None => {
                debug!(layout = layout.name(), len = layout.expected_len(), "layout registered");
                self.layouts.push(layout);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.position(name).map(|index| &self.layouts[index])
    }

    pub fn for_len(&self, len: usize) -> Option<&Layout> {
        self.layouts.iter().find(|layout| layout.expected_len() == len)
    }

    /// Distinct expected lengths, ascending.
    pub fn known_lengths(&self) -> Vec<usize> {
        let mut lengths: Vec<usize> = self.layouts.iter().map(Layout::expected_len).collect();
        lengths.sort_unstable();
        lengths.dedup();
        lengths
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layout> {
        self.layouts.iter()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Pick a layout from the payload length, then decode.
    ///
    /// # Errors
    /// Returns `DecodeError::NoLayoutForLength` when no layout matches, or
    /// any error from [`decode`].
    pub fn decode_auto(&self, payload: &[u8]) -> Result<(&Layout, UplinkOutput), DecodeError> {
        let layout = self
            .for_len(payload.len())
            .ok_or_else(|| DecodeError::NoLayoutForLength {
                actual: payload.len(),
                known: self.known_lengths(),
            })?;
        Ok((layout, UplinkOutput::from(decode(layout, payload))))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.layouts
            .iter()
            .position(|layout| layout.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutRegistry;
    use crate::payload::{DecodeError, FieldSpec, Layout, Width};

    #[test]
    fn builtin_registry_has_four_layouts() {
        let registry = LayoutRegistry::builtin().unwrap();
        let names: Vec<_> = registry.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
        assert_eq!(registry.known_lengths(), [8, 12, 16]);
    }

    #[test]
    fn length_selection_prefers_first_registered() {
        let registry = LayoutRegistry::builtin().unwrap();
        assert_eq!(registry.for_len(8).unwrap().name(), "a");
        assert_eq!(registry.for_len(12).unwrap().name(), "c");
        assert!(registry.for_len(10).is_none());
    }

    #[test]
    fn insert_replaces_by_name() {
        let mut registry = LayoutRegistry::builtin().unwrap();
        let custom = Layout::new(
            "A",
            2,
            vec![FieldSpec::signed("Battery", 0, Width::Bits16)],
        )
        .unwrap();
        let previous = registry.insert(custom).unwrap();
        assert_eq!(previous.name(), "a");
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("a").unwrap().expected_len(), 2);
    }

    #[test]
    fn decode_auto_reports_known_lengths() {
        let registry = LayoutRegistry::builtin().unwrap();
        let err = registry.decode_auto(&[0u8; 5]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NoLayoutForLength {
                actual: 5,
                known: vec![8, 12, 16],
            }
        );
    }

    #[test]
    fn decode_auto_uses_sixteen_byte_layout() {
        let registry = LayoutRegistry::builtin().unwrap();
        let (layout, output) = registry.decode_auto(&[0u8; 16]).unwrap();
        assert_eq!(layout.name(), "d");
        let data = output.data().unwrap();
        assert_eq!(
            data.get("Timestamp").and_then(|v| v.as_str()),
            Some("1970-01-01T00:00:00.000Z")
        );
    }
}
