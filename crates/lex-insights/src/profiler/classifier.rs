//! Column classification from declared storage types.

use crate::types::ColumnType;
use indexmap::IndexMap;
use polars::prelude::*;

/// Classify a column by its storage type.
///
/// Contents are never sniffed: a string column of digits is categorical.
pub fn classify(column: &Column) -> ColumnType {
    ColumnType::from_dtype(column.dtype())
}

/// Classify every column of a dataset, in column order.
pub fn classify_columns(df: &DataFrame) -> IndexMap<String, ColumnType> {
    df.get_columns()
        .iter()
        .map(|col| (col.name().to_string(), classify(col)))
        .collect()
}

/// Names of the columns classified as `column_type`, in column order.
pub fn columns_of_type(df: &DataFrame, column_type: ColumnType) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| classify(col) == column_type)
        .map(|col| col.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_storage_type() {
        let df = df! {
            "amount" => &[1.5f64, 2.5],
            "count" => &[1i64, 2],
            "flag" => &[true, false],
            "label" => &["a", "b"],
            "digits" => &["42", "17"],
        }
        .unwrap();

        let types = classify_columns(&df);
        assert_eq!(types["amount"], ColumnType::Numeric);
        assert_eq!(types["count"], ColumnType::Numeric);
        assert_eq!(types["flag"], ColumnType::Boolean);
        assert_eq!(types["label"], ColumnType::Categorical);
        // No content sniffing
        assert_eq!(types["digits"], ColumnType::Categorical);
    }

    #[test]
    fn test_classify_date_and_null_columns() {
        let dates = Series::new("day".into(), &[19_000i32, 19_001])
            .cast(&DataType::Date)
            .unwrap();
        let nulls = Series::new_null("empty".into(), 2);
        let df = DataFrame::new(vec![dates.into(), nulls.into()]).unwrap();

        assert_eq!(classify(df.column("day").unwrap()), ColumnType::Datetime);
        assert_eq!(classify(df.column("empty").unwrap()), ColumnType::Unknown);
    }

    #[test]
    fn test_wide_integer_and_decimal_columns_are_numeric() {
        let wide = Series::new("wide".into(), &[1i64, 2, 3])
            .cast(&DataType::Int128)
            .unwrap();
        let price = Series::new("price".into(), &[1.5f64, 2.25, 3.0])
            .cast(&DataType::Decimal(Some(10), Some(2)))
            .unwrap();
        let df = DataFrame::new(vec![wide.into(), price.into()]).unwrap();

        assert_eq!(
            columns_of_type(&df, ColumnType::Numeric),
            vec!["wide", "price"]
        );
    }

    #[test]
    fn test_enum_column_is_categorical() {
        let dtype = DataType::from_frozen_categories(FrozenCategories::new(["n", "s"]).unwrap());
        let region = Series::new("region".into(), &["n", "s", "n"])
            .cast(&dtype)
            .unwrap();
        let df = DataFrame::new(vec![region.into()]).unwrap();

        assert_eq!(classify(df.column("region").unwrap()), ColumnType::Categorical);

        let counts = crate::utils::value_counts(df.column("region").unwrap().as_materialized_series())
            .unwrap();
        assert_eq!(counts[0].value, "n");
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_columns_of_type_keeps_order() {
        let df = df! {
            "b" => &[1i32, 2],
            "name" => &["x", "y"],
            "a" => &[0.5f64, 1.5],
        }
        .unwrap();

        assert_eq!(columns_of_type(&df, ColumnType::Numeric), vec!["b", "a"]);
    }
}
