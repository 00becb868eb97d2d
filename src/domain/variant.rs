//! Variant identity for cart lines.
//!
//! Two lines are the same logical entry when their [`VariantKey`]s are equal.
//! Every dimension is normalized (trimmed, lowercased) and a missing
//! dimension is the empty string, so "no color" is its own stable value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that names a product variant: a cart line, a UI selection, a
/// remove/update request.
pub trait VariantSource {
    fn product_id(&self) -> &str;
    fn color(&self) -> Option<&str>;
    fn size(&self) -> Option<&str>;
    fn option_label(&self) -> Option<&str>;
    fn count_label(&self) -> Option<&str>;

    fn variant_key(&self) -> VariantKey {
        VariantKey::build(self)
    }

    /// True when at least one variant dimension carries a non-blank value.
    fn has_dimensions(&self) -> bool {
        [self.color(), self.size(), self.option_label(), self.count_label()]
            .into_iter()
            .any(|d| !normalize(d).is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub product_id: String,
    pub color: String,
    pub size: String,
    pub option_label: String,
    pub count_label: String,
}

impl VariantKey {
    pub fn build<S: VariantSource + ?Sized>(source: &S) -> Self {
        Self {
            product_id: source.product_id().trim().to_string(),
            color: normalize(source.color()),
            size: normalize(source.size()),
            option_label: normalize(source.option_label()),
            count_label: normalize(source.count_label()),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}|{}|{}", self.product_id, self.color, self.size, self.option_label, self.count_label)
    }
}

/// Normalized form of one variant dimension.
pub fn normalize(dimension: Option<&str>) -> String {
    dimension.map(|d| d.trim().to_lowercase()).unwrap_or_default()
}

/// Dimension equality under normalization.
pub fn same_dimension(a: Option<&str>, b: Option<&str>) -> bool {
    normalize(a) == normalize(b)
}

/// A product id plus whichever variant dimensions the caller knows about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSelection {
    #[serde(alias = "id", alias = "_id")]
    pub product_id: String,
    #[serde(default, alias = "chosenColor")]
    pub color: Option<String>,
    #[serde(default, alias = "chosenSize")]
    pub size: Option<String>,
    #[serde(default)]
    pub option_label: Option<String>,
    #[serde(default, alias = "chosenCount")]
    pub count_label: Option<String>,
}

impl VariantSelection {
    pub fn product(product_id: impl Into<String>) -> Self {
        Self { product_id: product_id.into(), ..Self::default() }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_option(mut self, label: impl Into<String>) -> Self {
        self.option_label = Some(label.into());
        self
    }

    pub fn with_count(mut self, label: impl Into<String>) -> Self {
        self.count_label = Some(label.into());
        self
    }
}

impl VariantSource for VariantSelection {
    fn product_id(&self) -> &str { &self.product_id }
    fn color(&self) -> Option<&str> { self.color.as_deref() }
    fn size(&self) -> Option<&str> { self.size.as_deref() }
    fn option_label(&self) -> Option<&str> { self.option_label.as_deref() }
    fn count_label(&self) -> Option<&str> { self.count_label.as_deref() }
}
