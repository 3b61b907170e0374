use crate::models::{ItemStatus, StockLevels};

/// Stock status as a function of on-hand stock and the reorder threshold.
pub fn derive_status(stock: u32, min_stock: u32) -> ItemStatus {
    if stock == 0 {
        ItemStatus::OutOfStock
    } else if stock < min_stock {
        ItemStatus::LowStock
    } else {
        ItemStatus::InStock
    }
}

impl StockLevels {
    pub fn status(&self) -> ItemStatus {
        derive_status(self.stock, self.min_stock)
    }
}

/// Quantity to request when reordering: enough to reach the threshold, at least one.
pub fn reorder_quantity(levels: StockLevels) -> u32 {
    levels.min_stock.saturating_sub(levels.stock).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stock_is_out_of_stock() {
        assert_eq!(derive_status(0, 5), ItemStatus::OutOfStock);
        assert_eq!(derive_status(0, 0), ItemStatus::OutOfStock);
    }

    #[test]
    fn below_threshold_is_low_stock() {
        assert_eq!(derive_status(3, 5), ItemStatus::LowStock);
        assert_eq!(derive_status(1, 2), ItemStatus::LowStock);
    }

    #[test]
    fn at_or_above_threshold_is_in_stock() {
        assert_eq!(derive_status(5, 5), ItemStatus::InStock);
        assert_eq!(derive_status(15, 5), ItemStatus::InStock);
        assert_eq!(derive_status(1, 0), ItemStatus::InStock);
    }

    #[test]
    fn status_depends_only_on_stock_and_threshold() {
        for stock in 0..20u32 {
            for min_stock in 0..20u32 {
                let expected = if stock == 0 {
                    ItemStatus::OutOfStock
                } else if stock < min_stock {
                    ItemStatus::LowStock
                } else {
                    ItemStatus::InStock
                };
                assert_eq!(StockLevels { stock, min_stock }.status(), expected);
            }
        }
    }

    #[test]
    fn reorder_quantity_fills_the_gap_with_a_floor_of_one() {
        assert_eq!(reorder_quantity(StockLevels { stock: 2, min_stock: 5 }), 3);
        assert_eq!(reorder_quantity(StockLevels { stock: 10, min_stock: 5 }), 1);
        assert_eq!(reorder_quantity(StockLevels { stock: 0, min_stock: 0 }), 1);
    }
}
