use std::collections::BTreeSet;
use std::path::Path;

use log::info;

use crate::config::Config;
use crate::frame::{self, Frame, FrameError, Value};
use crate::util::plain_table;
use crate::validate;

/// Columns coerced to numbers and median-filled. The policy is fixed per
/// column name, not configurable.
const NUMERIC_COLUMNS: [&str; 3] = ["quantity", "price_per_unit", "total_spent"];

const PREVIEW_ROWS: usize = 5;

/// Clean a transactions CSV: load, normalise, coerce, fill, dedupe,
/// validate, save.
pub(crate) fn run_clean(input: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    println!("Loading data...");
    let mut frame = frame::read_csv(input)?;

    println!("Cleaning...");
    normalize_column_names(&mut frame);
    coerce_numeric(&mut frame)?;
    fill_missing(&mut frame);
    remove_duplicates(&mut frame);

    println!("Validating...");
    if !validate::check_unique(&frame, &config.id_column)? {
        println!("Warning: '{}' column values are not unique!", config.id_column);
    }

    println!("Missing values per column:");
    validate::print_missing_counts(&frame);

    println!("Numeric range checks:");
    validate::print_numeric_range_problems(&frame);

    println!("Saving cleaned data...");
    frame::write_csv(&frame, output)?;
    info!("Wrote {} rows to {}", frame.rows.len(), output.display());

    print_preview(&frame);
    println!("Cleaning finished");
    Ok(())
}

/// Trim column names, lowercase them and replace spaces with underscores.
pub(crate) fn normalize_column_names(frame: &mut Frame) {
    for column in frame.columns.iter_mut() {
        *column = column.trim().to_lowercase().replace(' ', "_");
    }
}

/// Parse the designated numeric columns as floats. Unparsable cells become
/// Missing instead of failing the run.
pub(crate) fn coerce_numeric(frame: &mut Frame) -> Result<(), FrameError> {
    for name in NUMERIC_COLUMNS {
        let col = frame.require_column(name)?;
        for row in frame.rows.iter_mut() {
            let cell = std::mem::replace(&mut row[col], Value::Missing);
            row[col] = match cell {
                // Rust's float parser accepts "NaN" and "inf"; those cells
                // count as missing, not as numbers.
                Value::Text(s) => match s.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => Value::Number(n),
                    _ => Value::Missing,
                },
                Value::Number(n) => Value::Number(n),
                _ => Value::Missing,
            };
        }
    }
    Ok(())
}

/// Fill missing values with the per-column policy: median for numeric
/// columns, fixed fallback strings for categorical ones, forward-fill for
/// the transaction date.
pub(crate) fn fill_missing(frame: &mut Frame) {
    for name in NUMERIC_COLUMNS {
        if let Some(col) = frame.column_index(name) {
            if let Some(median) = frame.median(col) {
                for row in frame.rows.iter_mut() {
                    if row[col].is_missing() {
                        row[col] = Value::Number(median);
                    }
                }
            }
        }
    }

    fill_text(frame, "item", "Unknown", false);
    fill_text(frame, "payment_method", "Other", true);
    fill_text(frame, "location", "Unspecified", true);

    if let Some(col) = frame.column_index("transaction_date") {
        for row in frame.rows.iter_mut() {
            let cell = std::mem::replace(&mut row[col], Value::Missing);
            row[col] = match cell {
                Value::Text(s) => match frame::parse_date(&s) {
                    Some(date) => Value::Date(date),
                    None => Value::Missing,
                },
                other => other,
            };
        }

        // Forward-fill from the last seen date. Leading missing rows stay
        // missing.
        let mut last: Option<Value> = None;
        for row in frame.rows.iter_mut() {
            if row[col].is_missing() {
                if let Some(previous) = &last {
                    row[col] = previous.clone();
                }
            } else {
                last = Some(row[col].clone());
            }
        }
    }
}

fn fill_text(frame: &mut Frame, name: &str, fallback: &str, treat_unknown_as_missing: bool) {
    if let Some(col) = frame.column_index(name) {
        for row in frame.rows.iter_mut() {
            if treat_unknown_as_missing {
                if let Value::Text(s) = &row[col] {
                    if s == "UNKNOWN" {
                        row[col] = Value::Missing;
                    }
                }
            }
            if row[col].is_missing() {
                row[col] = Value::Text(fallback.to_string());
            }
        }
    }
}

/// Drop rows that are exact duplicates of an earlier row, keeping the first.
pub(crate) fn remove_duplicates(frame: &mut Frame) {
    let before = frame.rows.len();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    frame.rows.retain(|row| seen.insert(Frame::row_key(row)));
    if frame.rows.len() < before {
        info!("Removed {} duplicate rows", before - frame.rows.len());
    }
}

fn print_preview(frame: &Frame) {
    let mut table = plain_table();
    table.set_header(&frame.columns);
    for row in frame.rows.iter().take(PREVIEW_ROWS) {
        table.add_row(row.iter().map(Value::display));
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::frame::tests::fixture_filename;

    fn transaction_frame() -> Frame {
        let mut frame = frame::read_csv(&fixture_filename("transactions.csv")).unwrap();
        normalize_column_names(&mut frame);
        frame
    }

    #[test]
    fn test_normalize_column_names() {
        let frame = transaction_frame();
        assert_eq!(
            frame.columns,
            vec![
                "id",
                "item",
                "quantity",
                "price_per_unit",
                "total_spent",
                "payment_method",
                "location",
                "transaction_date"
            ]
        );
        for column in &frame.columns {
            assert_eq!(column, &column.to_lowercase());
            assert!(!column.contains(' '));
        }
    }

    #[test]
    fn test_coerce_numeric() {
        let mut frame = transaction_frame();
        coerce_numeric(&mut frame).unwrap();

        let quantity = frame.column_index("quantity").unwrap();
        assert_eq!(frame.rows[0][quantity], Value::Number(2.0));
        // "ERROR" becomes a missing marker, not a failure.
        assert_eq!(frame.rows[1][quantity], Value::Missing);
    }

    #[test]
    fn test_coerce_numeric_nan_cell_becomes_missing() {
        let mut frame = Frame::new(vec![
            "quantity".to_string(),
            "price_per_unit".to_string(),
            "total_spent".to_string(),
        ]);
        for cell in ["NaN", "nan", "inf", "2"] {
            frame.rows.push(vec![
                Value::Text(cell.to_string()),
                Value::Text("1.0".to_string()),
                Value::Text("2.0".to_string()),
            ]);
        }
        coerce_numeric(&mut frame).unwrap();
        assert_eq!(frame.rows[0][0], Value::Missing);
        assert_eq!(frame.rows[1][0], Value::Missing);
        assert_eq!(frame.rows[2][0], Value::Missing);
        assert_eq!(frame.rows[3][0], Value::Number(2.0));

        // The pipeline keeps going: the NaN cells median-fill like any
        // other missing value.
        fill_missing(&mut frame);
        for row in &frame.rows {
            assert_eq!(row[0], Value::Number(2.0));
        }
    }

    #[test]
    fn test_coerce_numeric_requires_columns() {
        let mut frame = Frame::new(vec!["id".to_string()]);
        match coerce_numeric(&mut frame) {
            Err(FrameError::MissingColumn(_)) => {}
            _ => panic!("Unexpected result"),
        }
    }

    #[test]
    fn test_fill_missing_numeric_median() {
        let mut frame = transaction_frame();
        coerce_numeric(&mut frame).unwrap();
        fill_missing(&mut frame);

        // Quantities present: 2, 1, 3, 3, -1 -> median 2.
        let quantity = frame.column_index("quantity").unwrap();
        assert_eq!(frame.rows[1][quantity], Value::Number(2.0));

        // Prices present: 3.5, 2.0, 2.5, 4.0 -> median 3.0.
        let price = frame.column_index("price_per_unit").unwrap();
        assert_eq!(frame.rows[3][price], Value::Number(3.0));

        for name in NUMERIC_COLUMNS {
            let col = frame.column_index(name).unwrap();
            assert!(frame.rows.iter().all(|row| !row[col].is_missing()));
        }
    }

    #[test]
    fn test_fill_missing_categorical() {
        let mut frame = transaction_frame();
        coerce_numeric(&mut frame).unwrap();
        fill_missing(&mut frame);

        let item = frame.column_index("item").unwrap();
        assert_eq!(frame.rows[2][item], Value::Text("Unknown".to_string()));

        let payment = frame.column_index("payment_method").unwrap();
        assert_eq!(frame.rows[1][payment], Value::Text("Other".to_string()));

        let location = frame.column_index("location").unwrap();
        assert_eq!(frame.rows[2][location], Value::Text("Unspecified".to_string()));
    }

    #[test]
    fn test_fill_missing_date_forward_fill() {
        let mut frame = transaction_frame();
        coerce_numeric(&mut frame).unwrap();
        fill_missing(&mut frame);

        let date = frame.column_index("transaction_date").unwrap();
        // Row 2 has an unparsable date and takes the previous row's value.
        assert_eq!(
            frame.rows[2][date],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
    }

    #[test]
    fn test_fill_missing_leading_date_stays_missing() {
        let mut frame = Frame::new(vec!["transaction_date".to_string()]);
        frame.rows.push(vec![Value::Missing]);
        frame.rows.push(vec![Value::Text("2024-02-01".to_string())]);
        fill_missing(&mut frame);
        assert_eq!(frame.rows[0][0], Value::Missing);
        assert_eq!(
            frame.rows[1][0],
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_remove_duplicates() {
        let mut frame = transaction_frame();
        coerce_numeric(&mut frame).unwrap();
        fill_missing(&mut frame);
        remove_duplicates(&mut frame);

        assert_eq!(frame.rows.len(), 5);
        let mut keys: Vec<String> = frame.rows.iter().map(|row| Frame::row_key(row)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), frame.rows.len());
    }
}
