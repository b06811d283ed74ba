//! Property-based tests for classification, profiling and comparison.
//!
//! Tables are generated column by column with missing cells mixed in,
//! and every property is checked on the public API only.

use proptest::prelude::*;
use u_compare::classify::{classify, Classification};
use u_compare::compare::{aggregate, correlate, crosstab, ComparisonData, ComparisonResult};
use u_compare::config::CompareConfig;
use u_compare::dataframe::{Cell, Column, DataFrame};
use u_compare::profiling::missing_percent;
use u_compare::render::SvgRenderer;

// ── Strategies ────────────────────────────────────────────────────────

fn finite() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL.prop_filter("bounded", |x| x.abs() < 1e9)
}

fn numeric_cells(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<Cell>> {
    proptest::collection::vec(
        prop_oneof![4 => finite().prop_map(Cell::Number), 1 => Just(Cell::Missing)],
        min_len..=max_len,
    )
}

fn label_cells(len: usize, alphabet: &'static [&'static str]) -> impl Strategy<Value = Vec<Cell>> {
    proptest::collection::vec(
        prop_oneof![
            5 => prop::sample::select(alphabet).prop_map(Cell::from),
            1 => Just(Cell::Missing),
        ],
        len,
    )
}

const GROUPS: &[&str] = &["north", "south", "east", "west", "centre"];
const LABELS: &[&str] = &["yes", "no", "maybe"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn all_numbers_classify_numeric(values in proptest::collection::vec(finite(), 1..40)) {
        let cells: Vec<Cell> = values.iter().map(|v| Cell::Text(v.to_string())).collect();
        prop_assert_eq!(classify(&Column::from_cells(&cells)), Classification::Numeric);
    }

    #[test]
    fn all_missing_classify_categorical(n in 0usize..40) {
        let cells = vec![Cell::Missing; n];
        prop_assert_eq!(classify(&Column::from_cells(&cells)), Classification::Categorical);
    }

    // ── Profiling ───────────────────────────────────────────────────

    #[test]
    fn missing_percent_in_range(cells in numeric_cells(1, 60)) {
        let col = Column::from_cells(&cells);
        let pct = missing_percent(&col);
        prop_assert!((0.0..=100.0).contains(&pct));
        if cells.iter().all(|c| !c.is_missing()) {
            prop_assert_eq!(pct, 0.0);
        }
    }

    // ── Group aggregation ───────────────────────────────────────────

    #[test]
    fn groups_sorted_by_mean_desc(
        (groups, values) in (1usize..80).prop_flat_map(|n| (label_cells(n, GROUPS), numeric_cells(n, n)))
    ) {
        let g = Column::from_cells(&groups);
        let v = Column::from_cells(&values);
        let out = aggregate(&g, &v, "g", "v", &CompareConfig::default());
        let table = out.groups.expect("five groups never hit the cutoff");
        let means: Vec<Option<f64>> = table.values().map(|s| s.mean).collect();
        for pair in means.windows(2) {
            match (pair[0], pair[1]) {
                (Some(a), Some(b)) => prop_assert!(a >= b, "{} before {}", a, b),
                (None, Some(_)) => prop_assert!(false, "group without mean sorted first"),
                _ => {}
            }
        }
        let total: usize = table.values().map(|s| s.count).sum();
        let complete = (0..g.len()).filter(|&i| g.is_valid(i) && v.is_valid(i)).count();
        prop_assert_eq!(total, complete);
    }

    #[test]
    fn cutoff_gates_table_and_chart(n in 40usize..70) {
        let groups: Vec<Cell> = (0..n).map(|i| Cell::from(format!("k{i}"))).collect();
        let values: Vec<Cell> = (0..n).map(|i| Cell::from(i as f64)).collect();
        let out = aggregate(
            &Column::from_cells(&groups),
            &Column::from_cells(&values),
            "k",
            "v",
            &CompareConfig::default(),
        );
        prop_assert_eq!(out.groups.is_some(), n <= 50);
        prop_assert_eq!(out.chart.is_some(), n <= 50);
    }

    // ── Correlation ─────────────────────────────────────────────────

    #[test]
    fn correlation_bounded(
        (xs, ys) in (2usize..60).prop_flat_map(|n| (numeric_cells(n, n), numeric_cells(n, n)))
    ) {
        let out = correlate(
            &Column::from_cells(&xs),
            &Column::from_cells(&ys),
            "x",
            "y",
            &CompareConfig::default().with_sample_seed(1),
        );
        prop_assert!(out.correlation.is_finite());
        prop_assert!((-1.0..=1.0).contains(&out.correlation));
    }

    // ── Cross tabulation ────────────────────────────────────────────

    #[test]
    fn crosstab_sums_to_row_count(
        (a, b) in (1usize..80).prop_flat_map(|n| (label_cells(n, GROUPS), label_cells(n, LABELS)))
    ) {
        let ca = Column::from_cells(&a);
        let cb = Column::from_cells(&b);
        let table = crosstab(&ca, &cb);
        let total: usize = table.values().flat_map(|row| row.values()).sum();
        let complete = a.iter().zip(&b).filter(|(x, y)| !x.is_missing() && !y.is_missing()).count();
        prop_assert_eq!(total, complete);
        if a.iter().chain(&b).all(|c| !c.is_missing()) {
            prop_assert_eq!(total, a.len());
        }
    }

    // ── Serialization ───────────────────────────────────────────────

    #[test]
    fn comparison_result_round_trips(
        (groups, values) in (1usize..30).prop_flat_map(|n| (label_cells(n, GROUPS), numeric_cells(n, n)))
    ) {
        let df = DataFrame::from_cells(vec![("g".into(), groups), ("v".into(), values)]).unwrap();
        let Ok(result) = u_compare::compare::compare(
            &df,
            "g",
            "v",
            &CompareConfig::default(),
            &SvgRenderer::default(),
        ) else {
            return Err(TestCaseError::fail("comparison failed"));
        };
        let text = serde_json::to_string(&result).unwrap();
        let back: ComparisonResult = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(back.strategy(), result.strategy());
        if let (ComparisonData::GroupComparison(Some(a)), ComparisonData::GroupComparison(Some(b))) =
            (&back.data, &result.data)
        {
            prop_assert_eq!(a, b);
        }
    }
}
