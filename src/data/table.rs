//! Canonical Table Module
//! Typed view over one day's published capacity snapshot.

use chrono::NaiveDate;
use polars::prelude::*;

pub const DATE_COLUMN: &str = "Fecha";
pub const UNIT_COLUMN: &str = "Unidad";
pub const COMMUNITY_COLUMN: &str = "CCAA";
pub const PROVINCE_COLUMN: &str = "Provincia";

/// Identifier columns that duplicate the region name columns.
pub const ID_COLUMNS: [&str; 2] = ["COD_CCAA", "Cod_Provincia"];

/// Columns that describe a row rather than measure it.
const KEY_COLUMNS: [&str; 4] = [DATE_COLUMN, UNIT_COLUMN, COMMUNITY_COLUMN, PROVINCE_COLUMN];

/// Region grouping column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegionColumn {
    #[default]
    Province,
    Community,
}

impl RegionColumn {
    pub fn name(&self) -> &'static str {
        match self {
            RegionColumn::Province => PROVINCE_COLUMN,
            RegionColumn::Community => COMMUNITY_COLUMN,
        }
    }
}

/// Cleaned, typed representation of a capacity snapshot.
///
/// Rows keep the order in which the source delivered them; `Fecha` is a
/// non-null `Date` column.
#[derive(Debug, Clone)]
pub struct CapacityTable {
    df: DataFrame,
}

impl CapacityTable {
    pub(crate) fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Names of every column that is not a date, unit or region column.
    pub fn measurement_columns(&self) -> Vec<String> {
        self.column_names()
            .into_iter()
            .filter(|name| !KEY_COLUMNS.contains(&name.as_str()))
            .collect()
    }

    /// Row dates in table order.
    pub fn dates(&self) -> PolarsResult<Vec<Option<NaiveDate>>> {
        date_values(self.df.column(DATE_COLUMN)?)
    }

    /// Earliest and latest date present, or `None` for an empty table.
    pub fn date_range(&self) -> PolarsResult<Option<(NaiveDate, NaiveDate)>> {
        let dates = self.dates()?;
        let min = dates.iter().flatten().min().copied();
        let max = dates.iter().flatten().max().copied();
        Ok(min.zip(max))
    }

    /// Distinct non-null values of a region column, sorted with accents
    /// folded away so "Ávila" sits next to "Avila" rather than after "Zamora".
    pub fn distinct_values(&self, column: RegionColumn) -> PolarsResult<Vec<String>> {
        let unique = self.df.column(column.name())?.unique()?;
        let mut values: Vec<String> = string_values(&unique)?.into_iter().flatten().collect();

        values.sort_by_cached_key(|v| (fold_ascii(v), v.clone()));
        values.dedup();
        Ok(values)
    }
}

impl PartialEq for CapacityTable {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

/// Read a `Date` column as chrono dates.
pub(crate) fn date_values(column: &Column) -> PolarsResult<Vec<Option<NaiveDate>>> {
    Ok(column
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .collect())
}

/// Read any column as optional strings.
pub(crate) fn string_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let strings = column.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Strip Latin-1 diacritics and uppercase the result for comparison.
pub fn fold_ascii(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'À'..='Å' | 'à'..='å' => folded.push('A'),
            'Æ' | 'æ' => folded.push_str("AE"),
            'Ç' | 'ç' => folded.push('C'),
            'È'..='Ë' | 'è'..='ë' => folded.push('E'),
            'Ì'..='Ï' | 'ì'..='ï' => folded.push('I'),
            'Ð' | 'ð' => folded.push('D'),
            'Ñ' | 'ñ' => folded.push('N'),
            'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' => folded.push('O'),
            'Ù'..='Ü' | 'ù'..='ü' => folded.push('U'),
            'Ý' | 'ý' | 'ÿ' => folded.push('Y'),
            'ß' => folded.push_str("SS"),
            other => folded.extend(other.to_uppercase()),
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_provinces(provinces: &[&str]) -> CapacityTable {
        let df = DataFrame::new(vec![Column::new(
            PROVINCE_COLUMN.into(),
            provinces.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        )])
        .unwrap();
        CapacityTable::from_frame(df)
    }

    #[test]
    fn fold_ascii_strips_accents() {
        assert_eq!(fold_ascii("Ávila"), "AVILA");
        assert_eq!(fold_ascii("Castellón"), "CASTELLON");
        assert_eq!(fold_ascii("A Coruña"), "A CORUNA");
    }

    #[test]
    fn distinct_values_sorts_accented_names_by_base_letter() {
        let table = table_with_provinces(&["Zamora", "Ávila", "Almería", "Zamora", "Badajoz"]);
        let values = table.distinct_values(RegionColumn::Province).unwrap();
        assert_eq!(values, vec!["Almería", "Ávila", "Badajoz", "Zamora"]);
    }

    #[test]
    fn distinct_values_is_stable_and_duplicate_free() {
        let table = table_with_provinces(&["León", "Lugo", "León", "Lleida", "Lugo"]);
        let first = table.distinct_values(RegionColumn::Province).unwrap();
        let second = table.distinct_values(RegionColumn::Province).unwrap();
        assert_eq!(first, second);

        let mut deduped = first.clone();
        deduped.dedup();
        assert_eq!(first, deduped);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn measurement_columns_exclude_key_columns() {
        let df = DataFrame::new(vec![
            Column::new(UNIT_COLUMN.into(), vec!["UCI"]),
            Column::new(PROVINCE_COLUMN.into(), vec!["Madrid"]),
            Column::new("TOTAL CAMAS".into(), vec![10i64]),
            Column::new("INGRESOS COVID19".into(), vec![1i64]),
        ])
        .unwrap();
        let table = CapacityTable::from_frame(df);
        assert_eq!(
            table.measurement_columns(),
            vec!["TOTAL CAMAS".to_string(), "INGRESOS COVID19".to_string()]
        );
    }
}
