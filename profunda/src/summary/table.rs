use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use super::{keys, ColumnSummary};
use crate::config::SortOrder;
use crate::error::ProfileResult;
use crate::stats::ratio;

/// Table-level totals plus the per-column summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub n: u64,
    pub n_var: usize,
    pub n_cells_missing: u64,
    pub n_vars_with_missing: usize,
    pub n_vars_all_missing: usize,
    pub p_cells_missing: f64,
    /// Number of columns per semantic type name.
    pub types: BTreeMap<String, usize>,
    pub variables: IndexMap<String, ColumnSummary>,
}

impl TableSummary {
    /// Derives the totals from the column summaries of a table with `n` rows.
    pub fn from_variables(n: u64, variables: IndexMap<String, ColumnSummary>) -> ProfileResult<Self> {
        let mut n_cells_missing = 0;
        let mut n_vars_with_missing = 0;
        let mut n_vars_all_missing = 0;
        let mut types: BTreeMap<String, usize> = BTreeMap::new();

        for summary in variables.values() {
            if let Some(type_name) = summary.type_name() {
                *types.entry(type_name.to_string()).or_insert(0) += 1;
            }
            let n_missing = summary.count(keys::N_MISSING)?;
            n_cells_missing += n_missing;
            if n_missing > 0 {
                n_vars_with_missing += 1;
                if n_missing == n {
                    n_vars_all_missing += 1;
                }
            }
        }

        let n_var = variables.len();
        Ok(Self {
            n,
            n_var,
            n_cells_missing,
            n_vars_with_missing,
            n_vars_all_missing,
            p_cells_missing: ratio(n_cells_missing, n * n_var as u64),
            types,
            variables,
        })
    }

    pub fn variable(&self, name: &str) -> Option<&ColumnSummary> {
        self.variables.get(name)
    }
}

/// Reorders variables by name, case-insensitively.
pub fn sort_variables(
    mut variables: IndexMap<String, ColumnSummary>,
    order: SortOrder,
) -> IndexMap<String, ColumnSummary> {
    match order {
        SortOrder::Original => {}
        SortOrder::Ascending => {
            variables.sort_by(|a, _, b, _| a.to_lowercase().cmp(&b.to_lowercase()));
        }
        SortOrder::Descending => {
            variables.sort_by(|a, _, b, _| b.to_lowercase().cmp(&a.to_lowercase()));
        }
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(n_missing: u64, type_name: &str) -> ColumnSummary {
        let mut summary = ColumnSummary::new();
        summary.insert(keys::N_MISSING, n_missing);
        summary.insert(keys::TYPE, type_name);
        summary
    }

    #[test]
    fn test_totals() {
        let variables = IndexMap::from([
            ("a".to_string(), column(0, "Numeric")),
            ("b".to_string(), column(2, "Numeric")),
            ("c".to_string(), column(4, "Categorical")),
        ]);
        let table = TableSummary::from_variables(4, variables).unwrap();
        assert_eq!(table.n_var, 3);
        assert_eq!(table.n_cells_missing, 6);
        assert_eq!(table.n_vars_with_missing, 2);
        assert_eq!(table.n_vars_all_missing, 1);
        assert_eq!(table.p_cells_missing, 0.5);
        assert_eq!(table.types["Numeric"], 2);
        assert_eq!(table.types["Categorical"], 1);
    }

    #[test]
    fn test_empty_table() {
        let table = TableSummary::from_variables(0, IndexMap::new()).unwrap();
        assert_eq!(table.p_cells_missing, 0.0);
        assert_eq!(table.n_var, 0);
    }

    #[test]
    fn test_sort_variables() {
        let variables = IndexMap::from([
            ("b".to_string(), ColumnSummary::new()),
            ("A".to_string(), ColumnSummary::new()),
            ("c".to_string(), ColumnSummary::new()),
        ]);
        let ascending: Vec<_> = sort_variables(variables.clone(), SortOrder::Ascending)
            .into_keys()
            .collect();
        assert_eq!(ascending, vec!["A", "b", "c"]);
        let descending: Vec<_> = sort_variables(variables.clone(), SortOrder::Descending)
            .into_keys()
            .collect();
        assert_eq!(descending, vec!["c", "b", "A"]);
        let original: Vec<_> = sort_variables(variables, SortOrder::Original)
            .into_keys()
            .collect();
        assert_eq!(original, vec!["b", "A", "c"]);
    }

    #[test]
    fn test_columns_of_zero_rows_are_not_all_missing() {
        let variables = IndexMap::from([
            ("a".to_string(), column(0, "Numeric")),
            ("b".to_string(), column(0, "Categorical")),
        ]);
        let table = TableSummary::from_variables(0, variables).unwrap();
        assert_eq!(table.n_vars_with_missing, 0);
        assert_eq!(table.n_vars_all_missing, 0);
        assert_eq!(table.p_cells_missing, 0.0);
    }
}
