//! Positional parameter collection.

/// A positional placeholder in a query (`$3` → `number = 3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Param {
    pub number: i32,
}

/// Insert `param` keeping the list ascending by number, dropping duplicates.
pub(crate) fn add_param(params: &mut Vec<Param>, param: Param) {
    if let Err(pos) = params.binary_search(&param) {
        params.insert(pos, param);
    }
}

/// Fold another collection of placeholders into `params`.
pub(crate) fn merge_params(params: &mut Vec<Param>, extra: impl IntoIterator<Item = Param>) {
    for param in extra {
        add_param(params, param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(params: &[Param]) -> Vec<i32> {
        params.iter().map(|p| p.number).collect()
    }

    #[test]
    fn test_add_param_orders_and_dedups() {
        let mut params = Vec::new();
        for n in [1, 3, 1, 2] {
            add_param(&mut params, Param { number: n });
        }
        assert_eq!(numbers(&params), vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_params() {
        let mut params = vec![Param { number: 2 }];
        merge_params(&mut params, [Param { number: 5 }, Param { number: 1 }]);
        merge_params(&mut params, vec![Param { number: 2 }]);
        assert_eq!(numbers(&params), vec![1, 2, 5]);
    }
}
