//! Branch selection for an eligible position

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where an eligible position goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Branch {
    /// Reserve covers the debt; collateral moves into backstop holdings
    Buffered,
    /// Reserve is short; the collateral is sold through the dark pool
    DarkPool,
}

/// Decide the branch from the reserve and the debt alone
#[inline]
pub fn select_branch(reserve: Decimal, debt: Decimal) -> Branch {
    if reserve >= debt {
        Branch::Buffered
    } else {
        Branch::DarkPool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_cover_is_buffered() {
        assert_eq!(select_branch(dec!(800), dec!(800)), Branch::Buffered);
        assert_eq!(select_branch(dec!(1150), dec!(1500)), Branch::DarkPool);
        assert_eq!(select_branch(Decimal::ZERO, dec!(0.01)), Branch::DarkPool);
    }

    proptest! {
        #[test]
        fn prop_branch_depends_only_on_reserve_and_debt(reserve in 0u64..1_000_000, debt in 1u64..1_000_000) {
            let (reserve, debt) = (Decimal::from(reserve), Decimal::from(debt));
            let branch = select_branch(reserve, debt);
            prop_assert_eq!(branch, select_branch(reserve, debt));
            prop_assert_eq!(branch == Branch::Buffered, reserve >= debt);
        }
    }
}
