use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::output::UplinkOutput;
use crate::registry::LayoutRegistry;

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// How each payload in a batch picks its layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayoutSelector {
    /// First registered layout whose expected length matches the payload.
    #[default]
    Auto,
    /// One named layout for every payload.
    Named(String),
}

impl FromStr for LayoutSelector {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("auto") {
            Ok(LayoutSelector::Auto)
        } else {
            Ok(LayoutSelector::Named(value.to_string()))
        }
    }
}

impl fmt::Display for LayoutSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSelector::Auto => f.write_str("auto"),
            LayoutSelector::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown layout \"{name}\" (known: {})", .known.join(", "))]
    UnknownLayout { name: String, known: Vec<String> },
}

/// Decoded batch of uplinks, in input order.
///
/// # Examples
/// ```
/// use sensorlink_core::{LayoutRegistry, LayoutSelector, decode_batch};
///
/// let registry = LayoutRegistry::builtin()?;
/// let payloads = [vec![0u8; 8], vec![0u8; 3]];
/// let report = decode_batch(&registry, &LayoutSelector::Auto, &payloads)?;
/// assert_eq!(report.decoded, 1);
/// assert_eq!(report.rejected, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// Layout selection used for the batch (`auto` or a layout name).
    pub layout_selection: String,
    /// Entries that produced data.
    pub decoded: u64,
    /// Entries that produced warnings.
    pub rejected: u64,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Zero-based position in the input.
    pub index: usize,
    /// Payload as lowercase hex.
    pub payload: String,
    /// Layout used, absent when none could be selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub result: UplinkOutput,
}

impl Report {
    pub fn has_warnings(&self) -> bool {
        self.rejected > 0
    }
}

/// Decode every payload and collect the outcomes.
///
/// Per-payload problems land in the entry's `warnings`; only an unknown
/// layout name fails the whole batch.
///
/// # Errors
/// Returns `ReportError::UnknownLayout` when `selector` names a layout the
/// registry does not hold.
pub fn decode_batch<I, P>(
    registry: &LayoutRegistry,
    selector: &LayoutSelector,
    payloads: I,
) -> Result<Report, ReportError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let fixed = match selector {
        LayoutSelector::Auto => None,
        LayoutSelector::Named(name) => Some(registry.get(name).ok_or_else(|| {
            ReportError::UnknownLayout {
                name: name.clone(),
                known: registry.iter().map(|l| l.name().to_string()).collect(),
            }
        })?),
    };

    let mut report = Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "sensorlink".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        layout_selection: selector.to_string(),
        decoded: 0,
        rejected: 0,
        entries: Vec::new(),
    };

    for (index, payload) in payloads.into_iter().enumerate() {
        let payload = payload.as_ref();
        let (layout, result) = match fixed {
            Some(layout) => (Some(layout), crate::payload::decode_uplink(layout, payload)),
            None => match registry.decode_auto(payload) {
                Ok((layout, output)) => (Some(layout), output),
                Err(err) => (None, UplinkOutput::Warnings(vec![err.to_string()])),
            },
        };

        if result.is_data() {
            report.decoded += 1;
        } else {
            report.rejected += 1;
            warn!(index, len = payload.len(), warnings = ?result.warnings(), "payload rejected");
        }

        report.entries.push(ReportEntry {
            index,
            payload: format_hex(payload),
            layout: layout.map(|l| l.name().to_string()),
            result,
        });
    }

    Ok(report)
}

fn format_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FieldValue;

    const LAYOUT_A_SAMPLE: [u8; 8] = [0x00, 0x64, 0xFF, 0x9C, 0x03, 0x84, 0x00, 0x0A];

    #[test]
    fn auto_selection_mixes_layouts() {
        let registry = LayoutRegistry::builtin().unwrap();
        let mut layout_d = vec![0u8; 8];
        layout_d.extend_from_slice(&LAYOUT_A_SAMPLE);
        let payloads = vec![LAYOUT_A_SAMPLE.to_vec(), layout_d, vec![0xAB; 5]];

        let report = decode_batch(&registry, &LayoutSelector::Auto, &payloads).unwrap();
        assert_eq!(report.decoded, 2);
        assert_eq!(report.rejected, 1);
        assert!(report.has_warnings());

        let layouts: Vec<_> = report.entries.iter().map(|e| e.layout.as_deref()).collect();
        assert_eq!(layouts, [Some("a"), Some("d"), None]);
        assert_eq!(report.entries[0].payload, "0064ff9c0384000a");
        assert_eq!(
            report.entries[1]
                .result
                .data()
                .and_then(|d| d.get("Temperature"))
                .cloned(),
            Some(FieldValue::Integer(-100))
        );
        assert!(report.entries[2].result.warnings()[0].contains("5-byte"));
    }

    #[test]
    fn named_selection_applies_to_every_payload() {
        let registry = LayoutRegistry::builtin().unwrap();
        let payloads = [LAYOUT_A_SAMPLE.to_vec(), vec![0u8; 16]];
        let selector: LayoutSelector = "b".parse().unwrap();

        let report = decode_batch(&registry, &selector, &payloads).unwrap();
        assert_eq!(report.layout_selection, "b");
        assert_eq!(report.decoded, 1);
        assert_eq!(report.entries[1].layout.as_deref(), Some("b"));
        assert!(report.entries[1].result.warnings()[0].contains("expected 8 bytes"));
    }

    #[test]
    fn unknown_layout_fails_the_batch() {
        let registry = LayoutRegistry::builtin().unwrap();
        let selector = LayoutSelector::Named("zz".to_string());
        let err = decode_batch(&registry, &selector, [LAYOUT_A_SAMPLE]).unwrap_err();
        assert!(err.to_string().contains("known: a, b, c, d"));
    }

    #[test]
    fn rejected_entry_omits_layout_key() {
        let registry = LayoutRegistry::builtin().unwrap();
        let report = decode_batch(&registry, &LayoutSelector::Auto, [[0u8; 1]]).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        let entry = &value["entries"][0];
        assert!(entry.get("layout").is_none());
        assert!(entry["result"].get("warnings").is_some());
    }

    #[test]
    fn selector_parses_auto() {
        assert_eq!("AUTO".parse::<LayoutSelector>().unwrap(), LayoutSelector::Auto);
        assert_eq!(
            "c".parse::<LayoutSelector>().unwrap(),
            LayoutSelector::Named("c".to_string())
        );
    }
}
