//! Per-product stock ledger.

mod adjust;

pub use adjust::{decrement, increment};

use serde::{Deserialize, Serialize};

/// Derived availability bucket for a product.
///
/// Always recomputed from `total_stock`, never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    OutOfStock,
}

/// Units at or below which a product counts as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

impl StockStatus {
    /// Derives the bucket from a total stock count.
    pub fn derive(total_stock: u32) -> Self {
        if total_stock == 0 {
            StockStatus::OutOfStock
        } else if total_stock <= LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Returns the bucket as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stock held for one color of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStock {
    pub color: String,
    pub stock: u32,
}

impl ColorStock {
    pub fn new(color: impl Into<String>, stock: u32) -> Self {
        Self {
            color: color.into(),
            stock,
        }
    }
}

/// Stock held for one size of one color (sized products only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock {
    pub size: String,
    pub stock: u32,
}

/// Per-color size breakdown for sized products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSizeStock {
    pub color: String,
    pub sizes: Vec<SizeStock>,
}

/// The per-product stock record; the numeric truth of availability.
///
/// When `color_stock` is non-empty, `total_stock` equals the sum over its
/// entries (or over all size entries when the size grid is present);
/// otherwise it is an independent counter.
///
/// `version` is an optimistic-concurrency token: ledger writes are
/// conditional on it, so two racing adjustments cannot silently overwrite
/// each other. The source system had no such guard; see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StockLedger {
    pub total_stock: u32,
    #[serde(default)]
    pub color_stock: Vec<ColorStock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_size_stock: Option<Vec<ColorSizeStock>>,
    pub stock_status: StockStatus,
    #[serde(default)]
    pub version: i64,
}

impl StockLedger {
    /// Creates a ledger with a plain total counter and no color breakdown.
    pub fn with_total(total_stock: u32) -> Self {
        Self {
            total_stock,
            color_stock: Vec::new(),
            color_size_stock: None,
            stock_status: StockStatus::derive(total_stock),
            version: 0,
        }
    }

    /// Creates a ledger from a color breakdown; the total is derived.
    pub fn with_colors(color_stock: Vec<ColorStock>) -> Self {
        let total_stock = color_stock.iter().map(|c| c.stock).sum();
        Self {
            total_stock,
            color_stock,
            color_size_stock: None,
            stock_status: StockStatus::derive(total_stock),
            version: 0,
        }
    }

    /// Looks up a color entry case-insensitively.
    pub fn color(&self, name: &str) -> Option<&ColorStock> {
        self.color_stock
            .iter()
            .find(|c| c.color.eq_ignore_ascii_case(name))
    }

    /// Sum of all size entries across all colors, when the size grid exists.
    pub fn size_grid_total(&self) -> Option<u32> {
        self.color_size_stock
            .as_ref()
            .filter(|grid| !grid.is_empty())
            .map(|grid| {
                grid.iter()
                    .flat_map(|c| c.sizes.iter())
                    .map(|s| s.stock)
                    .sum()
            })
    }
}
