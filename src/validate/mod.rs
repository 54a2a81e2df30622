use std::collections::BTreeSet;

use crate::frame::{Frame, FrameError, Value};
use crate::util::plain_table;

/// Columns whose values must be strictly positive in a cleaned dataset.
const POSITIVE_COLUMNS: [&str; 2] = ["quantity", "price_per_unit"];

/// True when every non-missing value in the column is distinct.
pub(crate) fn check_unique(frame: &Frame, column: &str) -> Result<bool, FrameError> {
    let col = frame.require_column(column)?;
    let mut seen = BTreeSet::new();
    for row in &frame.rows {
        if row[col].is_missing() {
            continue;
        }
        if !seen.insert(Frame::row_key(&row[col..col + 1])) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Count of missing cells per column.
pub(crate) fn missing_counts(frame: &Frame) -> Vec<(String, usize)> {
    frame
        .columns
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let count = frame.rows.iter().filter(|row| row[col].is_missing()).count();
            (name.clone(), count)
        })
        .collect()
}

/// Sub-frames of rows violating the positivity checks, keyed by column.
pub(crate) fn numeric_range_problems(frame: &Frame) -> Vec<(String, Frame)> {
    let mut problems = vec![];
    for name in POSITIVE_COLUMNS {
        if let Some(col) = frame.column_index(name) {
            let mut subset = Frame::new(frame.columns.clone());
            for row in &frame.rows {
                if let Value::Number(n) = row[col] {
                    if n <= 0.0 {
                        subset.rows.push(row.clone());
                    }
                }
            }
            problems.push((name.to_string(), subset));
        }
    }
    problems
}

pub(crate) fn print_missing_counts(frame: &Frame) {
    let mut table = plain_table();
    table.set_header(vec!["Column", "Missing"]);
    for (name, count) in missing_counts(frame) {
        table.add_row(vec![name, count.to_string()]);
    }
    println!("{table}");
}

pub(crate) fn print_numeric_range_problems(frame: &Frame) {
    for (name, subset) in numeric_range_problems(frame) {
        if subset.rows.is_empty() {
            println!("{}: no non-positive values", name);
            continue;
        }
        println!("{}: {} rows with non-positive values", name, subset.rows.len());
        let mut table = plain_table();
        table.set_header(&subset.columns);
        for row in &subset.rows {
            table.add_row(row.iter().map(Value::display));
        }
        println!("{table}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_ids(ids: &[&str]) -> Frame {
        let mut frame = Frame::new(vec!["id".to_string()]);
        for id in ids {
            let cell = if id.is_empty() {
                Value::Missing
            } else {
                Value::Text(id.to_string())
            };
            frame.rows.push(vec![cell]);
        }
        frame
    }

    #[test]
    fn test_check_unique() {
        assert!(check_unique(&frame_with_ids(&["1", "2", "3"]), "id").unwrap());
        assert!(!check_unique(&frame_with_ids(&["1", "2", "1"]), "id").unwrap());
        // Missing cells do not count as duplicates of each other.
        assert!(check_unique(&frame_with_ids(&["1", "", ""]), "id").unwrap());
    }

    #[test]
    fn test_check_unique_missing_column() {
        match check_unique(&frame_with_ids(&["1"]), "transaction_id") {
            Err(FrameError::MissingColumn(_)) => {}
            _ => panic!("Unexpected result"),
        }
    }

    #[test]
    fn test_missing_counts() {
        let mut frame = Frame::new(vec!["a".to_string(), "b".to_string()]);
        frame.rows.push(vec![Value::Missing, Value::Number(1.0)]);
        frame.rows.push(vec![Value::Missing, Value::Missing]);
        let counts = missing_counts(&frame);
        assert_eq!(counts, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }

    #[test]
    fn test_numeric_range_problems() {
        let mut frame = Frame::new(vec!["quantity".to_string(), "price_per_unit".to_string()]);
        frame.rows.push(vec![Value::Number(2.0), Value::Number(3.5)]);
        frame.rows.push(vec![Value::Number(-1.0), Value::Number(0.0)]);
        frame.rows.push(vec![Value::Number(0.0), Value::Number(1.0)]);

        let problems = numeric_range_problems(&frame);
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].0, "quantity");
        assert_eq!(problems[0].1.rows.len(), 2);
        assert_eq!(problems[1].0, "price_per_unit");
        assert_eq!(problems[1].1.rows.len(), 1);
    }

    #[test]
    fn test_numeric_range_problems_absent_columns() {
        let frame = Frame::new(vec!["other".to_string()]);
        assert!(numeric_range_problems(&frame).is_empty());
    }
}
