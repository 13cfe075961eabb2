use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{DataPoint, Rgb, default_color};
use crate::error::{PlotError, PlotResult};

const DEFAULT_MARKER_SIZE: f32 = 3.0;
const DEFAULT_LINE_WIDTH: f32 = 3.0;
const DEFAULT_HIGHLIGHT_LINE_WIDTH: f32 = 5.0;

/// Visual style reported alongside item labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStyle {
    pub color: Rgb,
    pub marker_size: f32,
    pub line_width: f32,
    pub highlight_line_width: f32,
}

impl ItemStyle {
    /// Default sizes with the palette color for `item_id`.
    #[must_use]
    pub fn for_item(item_id: usize) -> Self {
        Self {
            color: default_color(item_id),
            marker_size: DEFAULT_MARKER_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
            highlight_line_width: DEFAULT_HIGHLIGHT_LINE_WIDTH,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// `rrggbb:marker_size:line_width`, as consumed by the front end legend.
    #[must_use]
    pub fn to_style_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.color.to_hex(),
            self.marker_size,
            self.line_width
        )
    }
}

fn default_marker_size() -> f32 {
    DEFAULT_MARKER_SIZE
}

fn default_line_width() -> f32 {
    DEFAULT_LINE_WIDTH
}

fn default_highlight_line_width() -> f32 {
    DEFAULT_HIGHLIGHT_LINE_WIDTH
}

/// Options for one group of items added together.
///
/// `label` names a single item, `labels` names every item of the group; the
/// two are mutually exclusive. Without either, items are called
/// `Line #<item id>`. `colors`, when given, holds one color per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<Rgb>>,
    #[serde(default = "default_marker_size")]
    pub marker_size: f32,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default = "default_highlight_line_width")]
    pub highlight_line_width: f32,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            label: None,
            labels: None,
            colors: None,
            marker_size: DEFAULT_MARKER_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
            highlight_line_width: DEFAULT_HIGHLIGHT_LINE_WIDTH,
        }
    }
}

impl ItemOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Rgb>) -> Self {
        self.colors = Some(colors);
        self
    }

    #[must_use]
    pub fn with_marker_size(mut self, marker_size: f32) -> Self {
        self.marker_size = marker_size;
        self
    }

    #[must_use]
    pub fn with_line_width(mut self, line_width: f32) -> Self {
        self.line_width = line_width;
        self
    }

    #[must_use]
    pub fn with_highlight_line_width(mut self, highlight_line_width: f32) -> Self {
        self.highlight_line_width = highlight_line_width;
        self
    }

    pub fn from_json_str(input: &str) -> PlotResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| PlotError::InvalidConfig(format!("failed to parse item options: {e}")))
    }

    /// Checks the options against a group of `item_count` items.
    pub fn validate(&self, item_count: usize) -> PlotResult<()> {
        if item_count == 0 {
            return Err(PlotError::InvalidData(
                "an item group needs at least one item".to_owned(),
            ));
        }
        for (name, value) in [
            ("marker_size", self.marker_size),
            ("line_width", self.line_width),
            ("highlight_line_width", self.highlight_line_width),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlotError::InvalidConfig(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if let Some(colors) = &self.colors {
            if colors.len() != item_count {
                return Err(PlotError::InvalidConfig(format!(
                    "expected {item_count} colors, got {}",
                    colors.len()
                )));
            }
        }
        match (&self.label, &self.labels) {
            (Some(_), Some(_)) => Err(PlotError::InvalidConfig(
                "`label` and `labels` cannot be used together".to_owned(),
            )),
            (Some(_), None) if item_count != 1 => Err(PlotError::InvalidConfig(format!(
                "`label` requires exactly one item, got {item_count}; use `labels`"
            ))),
            (None, Some(labels)) if labels.len() != item_count => {
                Err(PlotError::InvalidConfig(format!(
                    "`labels` has {} entries for {item_count} items",
                    labels.len()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Labels for items `first_item_id..first_item_id + item_count`.
    pub fn resolve_labels(&self, first_item_id: usize, item_count: usize) -> PlotResult<Vec<String>> {
        self.validate(item_count)?;
        Ok(match (&self.label, &self.labels) {
            (Some(label), _) => vec![label.clone()],
            (None, Some(labels)) => labels.clone(),
            (None, None) => (first_item_id..first_item_id + item_count)
                .map(|item_id| format!("Line #{item_id}"))
                .collect(),
        })
    }

    fn style_for(&self, item_id: usize, index: usize) -> ItemStyle {
        let color = self
            .colors
            .as_ref()
            .and_then(|colors| colors.get(index).copied())
            .unwrap_or_else(|| default_color(item_id));
        ItemStyle {
            color,
            marker_size: self.marker_size,
            line_width: self.line_width,
            highlight_line_width: self.highlight_line_width,
        }
    }
}

/// Label search pattern sent by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelQuery {
    pub pat: String,
    #[serde(default)]
    pub regex: bool,
}

impl LabelQuery {
    #[must_use]
    pub fn substring(pat: impl Into<String>) -> Self {
        Self {
            pat: pat.into(),
            regex: false,
        }
    }

    #[must_use]
    pub fn regex(pat: impl Into<String>) -> Self {
        Self {
            pat: pat.into(),
            regex: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CatalogEntry {
    label: String,
    folded: String,
    style: ItemStyle,
    points: Vec<DataPoint>,
}

/// Labels, styles and points of every plotted item, indexed by item id.
///
/// Filled before the canvas is shown; the item id space is fixed afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemCatalog {
    entries: Vec<CatalogEntry>,
}

impl ItemCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item_count` items without point data and returns their ids.
    pub fn add_items(&mut self, item_count: usize, options: &ItemOptions) -> PlotResult<Range<usize>> {
        self.add_group(vec![Vec::new(); item_count], options)
    }

    /// Adds one item per line; each line keeps its points for nearest-point
    /// lookups.
    pub fn add_lines(
        &mut self,
        lines: Vec<Vec<DataPoint>>,
        options: &ItemOptions,
    ) -> PlotResult<Range<usize>> {
        self.add_group(lines, options)
    }

    /// Shorthand for [`ItemCatalog::add_items`] with explicit labels and
    /// optional colors. Returns the first new item id.
    pub fn extend_labels<I, S>(&mut self, labels: I, colors: Option<&[Rgb]>) -> PlotResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = ItemOptions::new().with_labels(labels);
        if let Some(colors) = colors {
            options = options.with_colors(colors.to_vec());
        }
        let item_count = options.labels.as_ref().map_or(0, Vec::len);
        Ok(self.add_items(item_count, &options)?.start)
    }

    // Validates the whole group first so a rejected group adds nothing.
    fn add_group(&mut self, lines: Vec<Vec<DataPoint>>, options: &ItemOptions) -> PlotResult<Range<usize>> {
        let start = self.entries.len();
        let labels = options.resolve_labels(start, lines.len())?;

        for (index, (label, points)) in labels.into_iter().zip(lines).enumerate() {
            self.entries.push(CatalogEntry {
                folded: label.to_lowercase(),
                label,
                style: options.style_for(start + index, index),
                points,
            });
        }
        debug!(first = start, count = self.entries.len() - start, "added items");
        Ok(start..self.entries.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn label(&self, item_id: usize) -> Option<&str> {
        self.entries.get(item_id).map(|entry| entry.label.as_str())
    }

    #[must_use]
    pub fn style(&self, item_id: usize) -> Option<ItemStyle> {
        self.entries.get(item_id).map(|entry| entry.style)
    }

    /// Data points of `item_id`; empty for items added without points.
    #[must_use]
    pub fn points(&self, item_id: usize) -> Option<&[DataPoint]> {
        self.entries.get(item_id).map(|entry| entry.points.as_slice())
    }

    /// Ids of items whose label matches `query`, ascending.
    ///
    /// Regex queries search the original labels; plain queries are
    /// case-insensitive substring matches. An invalid regex matches nothing.
    #[must_use]
    pub fn matching_ids(&self, query: &LabelQuery) -> Vec<usize> {
        if query.regex {
            let pattern = match Regex::new(&query.pat) {
                Ok(pattern) => pattern,
                Err(err) => {
                    warn!(pattern = %query.pat, error = %err, "invalid label regex, matching nothing");
                    return Vec::new();
                }
            };
            return self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| pattern.is_match(&entry.label))
                .map(|(item_id, _)| item_id)
                .collect();
        }

        let needle = query.pat.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.folded.contains(&needle))
            .map(|(item_id, _)| item_id)
            .collect()
    }
}
