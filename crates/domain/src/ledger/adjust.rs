//! Pure inventory adjustment.
//!
//! These functions compute a new ledger from a requested quantity, the
//! colors the order selected, and a direction. They never touch I/O and
//! never fail: insufficient stock rows are accepted as best-effort, because
//! availability was already checked at cart time and is not re-validated
//! during confirmation.

use super::{StockLedger, StockStatus};

/// Applies one unit of decrement to the ledger's color breakdown.
///
/// A requested color only absorbs the unit while it has stock left; an
/// exhausted or unknown color falls through to any entry with stock
/// remaining, in ledger order. Stock is floored at zero either way.
fn decrement_one(ledger: &mut StockLedger, color: Option<&str>) -> bool {
    if ledger.color_stock.is_empty() {
        return false;
    }
    if let Some(name) = color
        && let Some(entry) = ledger
            .color_stock
            .iter_mut()
            .find(|c| c.color.eq_ignore_ascii_case(name) && c.stock > 0)
    {
        entry.stock -= 1;
        return true;
    }
    if let Some(entry) = ledger.color_stock.iter_mut().find(|c| c.stock > 0) {
        entry.stock -= 1;
        return true;
    }
    false
}

/// Applies one unit of increment to the ledger's color breakdown.
///
/// The fallback picks the first entry with a non-empty color name rather
/// than the decrement rule's "any entry with stock". The asymmetry is
/// preserved from the system this engine reconciles against; see DESIGN.md.
fn increment_one(ledger: &mut StockLedger, color: Option<&str>) -> bool {
    if ledger.color_stock.is_empty() {
        return false;
    }
    if let Some(name) = color
        && let Some(entry) = ledger
            .color_stock
            .iter_mut()
            .find(|c| c.color.eq_ignore_ascii_case(name))
    {
        entry.stock += 1;
        return true;
    }
    if let Some(entry) = ledger
        .color_stock
        .iter_mut()
        .find(|c| !c.color.is_empty())
    {
        entry.stock += 1;
        return true;
    }
    false
}

fn apply_units(
    ledger: &mut StockLedger,
    requested_colors: &[String],
    quantity: u32,
    step: fn(&mut StockLedger, Option<&str>) -> bool,
) {
    let mut remaining = quantity;
    for color in requested_colors {
        if remaining == 0 {
            break;
        }
        if step(ledger, Some(color)) {
            remaining -= 1;
        }
    }
    while remaining > 0 && step(ledger, None) {
        remaining -= 1;
    }
}

/// Recomputes `total_stock` and `stock_status` after an adjustment.
///
/// Sized products derive the total from the size grid, regular products
/// from the color breakdown; products with neither fall back to adjusting
/// the bare counter by the requested quantity.
fn recompute(ledger: &mut StockLedger, counter_fallback: u32) {
    ledger.total_stock = if let Some(total) = ledger.size_grid_total() {
        total
    } else if !ledger.color_stock.is_empty() {
        ledger.color_stock.iter().map(|c| c.stock).sum()
    } else {
        counter_fallback
    };
    ledger.stock_status = StockStatus::derive(ledger.total_stock);
}

/// Computes the ledger after confirming an order.
///
/// Each requested color (in order) absorbs one unit, floored at zero. Once
/// the requested colors are exhausted, remaining units come from any entry
/// with stock left, in ledger order. Stock never goes negative, and a
/// quantity that cannot be fully applied is not an error.
pub fn decrement(ledger: &StockLedger, requested_colors: &[String], quantity: u32) -> StockLedger {
    let mut next = ledger.clone();
    apply_units(&mut next, requested_colors, quantity, decrement_one);
    let fallback = ledger.total_stock.saturating_sub(quantity);
    recompute(&mut next, fallback);
    next
}

/// Computes the ledger after cancelling or failing a confirmed order.
///
/// Mirror of [`decrement`], additive and unbounded above.
pub fn increment(ledger: &StockLedger, requested_colors: &[String], quantity: u32) -> StockLedger {
    let mut next = ledger.clone();
    apply_units(&mut next, requested_colors, quantity, increment_one);
    let fallback = ledger.total_stock + quantity;
    recompute(&mut next, fallback);
    next
}
