use chrono::{Datelike, Days, NaiveDate};

/// `numerator / denominator`, or 0 when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Gross margin in percent with the zero-sales guard.
pub fn margin_pct(gross_profit: f64, sales: f64) -> f64 {
    ratio(gross_profit, sales) * 100.0
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Month-end date of the month containing `date`.
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    last_day_of_month(date.year(), date.month())
}

pub fn next_month_end(date: NaiveDate) -> Option<NaiveDate> {
    let year = if date.month() == 12 {
        date.year() + 1
    } else {
        date.year()
    };

    let month = if date.month() == 12 {
        1
    } else {
        date.month() + 1
    };

    last_day_of_month(year, month)
}

/// The `count` month-end dates following `date`'s month.
pub fn following_month_ends(date: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = date;
    for _ in 0..count {
        match next_month_end(current) {
            Some(next) => {
                dates.push(next);
                current = next;
            }
            None => break,
        }
    }
    dates
}

/// Formats the calendar month of `date` as `YYYY-MM`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Pearson correlation of two equally long samples.
///
/// Undefined for fewer than two pairs or when either side has zero variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_guard() {
        assert_eq!(ratio(10.0, 4.0), 2.5);
        assert_eq!(ratio(10.0, 0.0), 0.0);
        assert_eq!(ratio(-3.0, 0.0), 0.0);
        assert_eq!(margin_pct(20.0, 100.0), 20.0);
        assert_eq!(margin_pct(20.0, 0.0), 0.0);
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn test_next_month_end() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(next_month_end(date), NaiveDate::from_ymd_opt(2023, 2, 28));

        let date = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap();
        assert_eq!(next_month_end(date), NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn test_following_month_ends_crosses_year() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 30).unwrap();
        let dates = following_month_ends(date, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            ]
        );
    }

    #[test]
    fn test_month_key() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(month_key(date), "2024-03");
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_pearson_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let r = pearson_correlation(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let inverse = [8.0, 6.0, 4.0, 2.0];
        let r = pearson_correlation(&xs, &inverse).unwrap();
        assert!((r + 1.0).abs() < 1e-12);

        assert_eq!(pearson_correlation(&xs, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), None);
    }
}
