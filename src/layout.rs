//! Column width allocation.
//!
//! Every render pass maps the session field set plus the current screen
//! width to per-field render widths. The allocation is pure and
//! deterministic, so re-running it after a resize is always safe.

use crate::schema::Field;

/// Separator overhead charged per column.
const SEPARATOR: usize = 2;

/// Assign a render width to every field, spending at most `available - 1`
/// columns including separators.
///
/// Fields start at their minimum widths. If even those do not fit, trailing
/// fields are dropped (width 0) in reverse declared order; freed space is
/// never redistributed to earlier fields on that path, and the first field
/// is kept as long as its minimum plus separator fits at all. Otherwise
/// fields grow toward their maximum in passes, each field receiving
/// `floor((maxwidth - width) / fieldCount)` per pass (at least 1), capped by
/// the slack still available. A pass that grows nothing, or a total that
/// lands exactly on the budget, ends the allocation.
pub fn allocate_widths(fields: &mut [Field], available: u16) {
    let available = available as usize;
    let count = fields.len();
    if count == 0 {
        return;
    }

    let mut total = 0usize;
    for field in fields.iter_mut() {
        field.width = field.minwidth;
        total += field.width as usize + SEPARATOR;
    }

    if total >= available {
        // Minimum widths overflow the screen: trim trailing columns. The
        // leading column survives whenever it fits at all.
        for (i, field) in fields.iter_mut().enumerate().rev() {
            if total < available.saturating_sub(1) {
                break;
            }
            if i == 0 && field.width as usize + SEPARATOR <= available {
                break;
            }
            total -= field.width as usize + SEPARATOR;
            field.width = 0;
        }
        return;
    }

    let budget = available - 1;
    loop {
        let mut grew = false;
        for i in 0..count {
            if total >= budget {
                return;
            }
            let width = fields[i].width as usize;
            let max = fields[i].maxwidth as usize;
            if width >= max {
                continue;
            }
            let mut increment = (max - width) / count;
            if increment < 1 {
                increment = 1;
            }
            if increment > budget - total {
                increment = budget - total;
            }
            fields[i].width += increment as u16;
            total += increment;
            grew = true;
            if total == budget {
                // Budget exactly exhausted mid-pass.
                return;
            }
        }
        if !grew {
            return;
        }
    }
}
