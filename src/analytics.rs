//! # Trend Analytics
//!
//! Dashboard metrics computed from a user's dated entries: streak,
//! consistency, skin-concern trends and product effectiveness.
//!
//! Everything here is a pure function. The current date is always passed in
//! as `today`, so results are reproducible in tests.
//!
//! Rounding follows round-half-to-even for every reported integer and for
//! the one-decimal product averages.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::pipeline_errors::PipelineError;

/// The analytics view of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub date: NaiveDate,
    pub skin_condition: Option<String>,
    pub analysis_result: Option<String>,
    pub products: Vec<String>,
}

impl EntrySnapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            skin_condition: None,
            analysis_result: None,
            products: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.skin_condition = Some(condition.to_string());
        self
    }

    pub fn with_analysis(mut self, analysis: &str) -> Self {
        self.analysis_result = Some(analysis.to_string());
        self
    }

    pub fn with_products(mut self, products: &[&str]) -> Self {
        self.products = products.iter().map(|p| p.to_string()).collect();
        self
    }

    /// An analysis counts only when it has text; a stored empty string does
    /// not.
    pub fn has_analysis_text(&self) -> bool {
        self.analysis_result
            .as_deref()
            .is_some_and(|text| !text.is_empty())
    }
}

/// `[today - days, today]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TimeWindow {
    pub fn ending_on(today: NaiveDate, days: u32) -> Result<Self, PipelineError> {
        if days == 0 {
            return Err(PipelineError::InvalidInput(
                "Analytics window must cover at least one day".to_string(),
            ));
        }
        let start_date = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("Window of {} days starts before year 0", days))
            })?;
        Ok(Self {
            days,
            start_date,
            end_date: today,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Consecutive days with an entry, counted backward from today, or from
/// yesterday when today has no entry yet.
pub fn calculate_streak<I>(entry_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let dates: HashSet<NaiveDate> = entry_dates.into_iter().collect();

    let mut current = if dates.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    while let Some(day) = current.filter(|d| dates.contains(d)) {
        streak += 1;
        current = day.pred_opt();
    }
    streak
}

/// `round(completed / window_days × 100)`.
pub fn consistency_percentage(completed_days: usize, window_days: u32) -> Result<u32, PipelineError> {
    if window_days == 0 {
        return Err(PipelineError::InvalidInput(
            "Consistency is undefined for a zero-day window".to_string(),
        ));
    }
    let ratio = completed_days as f64 / f64::from(window_days) * 100.0;
    Ok(ratio.round_ties_even() as u32)
}

/// Concern categories and the synonyms that reveal them in analysis text.
pub const CONCERN_KEYWORDS: [(&str, &[&str]); 5] = [
    ("acne", &["acne", "breakout", "pimple", "blemish"]),
    ("dark_circles", &["dark circle", "under eye"]),
    ("wrinkles", &["wrinkle", "fine line", "crow"]),
    ("spots", &["spot", "pigment", "hyperpigment"]),
    ("pores", &["pore", "enlarged pore"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Worsening,
    Stable,
}

/// Trend of one concern. `current` is a 0–100 score where higher is better;
/// `change` is positive when the concern became less frequent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendMetric {
    pub current: i64,
    pub change: i64,
    pub trend: Trend,
}

/// Compare how often each concern appears in the first and second half of
/// the analyzed entries. Entries without analysis text are ignored; fewer
/// than two analyzed entries yield no metrics.
pub fn concern_trends(entries: &[EntrySnapshot]) -> BTreeMap<&'static str, TrendMetric> {
    let mut analyzed: Vec<(NaiveDate, String)> = entries
        .iter()
        .filter_map(|e| e.analysis_result.as_ref().map(|a| (e.date, a.to_lowercase())))
        .collect();
    analyzed.sort_by_key(|(date, _)| *date);

    let midpoint = analyzed.len() / 2;
    let mut metrics = BTreeMap::new();
    if midpoint == 0 {
        return metrics;
    }

    for (concern, keywords) in CONCERN_KEYWORDS {
        let detections: Vec<f64> = analyzed
            .iter()
            .map(|(_, text)| {
                if keywords.iter().any(|k| text.contains(k)) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let (first, second) = detections.split_at(midpoint);
        let first_avg = first.iter().sum::<f64>() / first.len() as f64;
        let second_avg = second.iter().sum::<f64>() / second.len() as f64;

        let change = (second_avg - first_avg) / first_avg.max(0.01) * 100.0;
        let current = (100.0 - second_avg * 100.0).max(0.0);
        let trend = if change < 0.0 {
            Trend::Improving
        } else if change > 0.0 {
            Trend::Worsening
        } else {
            Trend::Stable
        };

        metrics.insert(
            concern,
            TrendMetric {
                current: current.round_ties_even() as i64,
                change: (-change).round_ties_even() as i64,
                trend,
            },
        );
    }

    metrics
}

/// Wellness score of a skin-condition label. Unknown labels score 50.
pub fn condition_score(condition: &str) -> u32 {
    match condition {
        "Clear" => 100,
        "Normal" => 90,
        "Combination" => 70,
        "Dry" | "Oily" => 60,
        "Sensitive" => 50,
        "Acne" => 30,
        _ => 50,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEffectiveness {
    pub product_name: String,
    pub uses: u32,
    /// Mean condition score, rounded to one decimal
    pub average_skin_score: f64,
    pub most_common_condition: String,
}

/// Average condition score of the entries each product was used on, best
/// first. Entries without a condition are skipped. Equal averages keep the
/// order in which products were first seen.
pub fn product_effectiveness(entries: &[EntrySnapshot]) -> Vec<ProductEffectiveness> {
    struct Tally {
        name: String,
        uses: u32,
        total_score: u32,
        conditions: Vec<(String, u32)>,
    }

    let mut tallies: Vec<Tally> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let Some(condition) = entry.skin_condition.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let score = condition_score(condition);

        for product in &entry.products {
            let slot = *index.entry(product.clone()).or_insert_with(|| {
                tallies.push(Tally {
                    name: product.clone(),
                    uses: 0,
                    total_score: 0,
                    conditions: Vec::new(),
                });
                tallies.len() - 1
            });
            let tally = &mut tallies[slot];
            tally.uses += 1;
            tally.total_score += score;
            match tally.conditions.iter_mut().find(|(c, _)| c == condition) {
                Some((_, count)) => *count += 1,
                None => tally.conditions.push((condition.to_string(), 1)),
            }
        }
    }

    let mut results: Vec<ProductEffectiveness> = tallies
        .into_iter()
        .map(|tally| {
            let average = f64::from(tally.total_score) / f64::from(tally.uses);
            ProductEffectiveness {
                most_common_condition: first_most_frequent(&tally.conditions)
                    .unwrap_or("Unknown")
                    .to_string(),
                product_name: tally.name,
                uses: tally.uses,
                average_skin_score: round_one_decimal(average),
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.average_skin_score
            .partial_cmp(&a.average_skin_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencySummary {
    pub percentage: u32,
    pub streak: u32,
    pub total_days: u32,
    pub completed_days: u32,
    pub missed_days: u32,
}

/// Condition counts in the order each condition first appeared. Serialized
/// as a JSON object with keys in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionDistribution(Vec<(String, u32)>);

impl ConditionDistribution {
    pub fn record(&mut self, condition: &str) {
        match self.0.iter_mut().find(|(c, _)| c == condition) {
            Some((_, count)) => *count += 1,
            None => self.0.push((condition.to_string(), 1)),
        }
    }

    pub fn get(&self, condition: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(c, _)| c == condition)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(c, count)| (c.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest count; the earliest condition wins a tie.
    pub fn most_common(&self) -> Option<&str> {
        first_most_frequent(&self.0)
    }
}

impl Serialize for ConditionDistribution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(c, count)| (c, count)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinTrendSummary {
    pub most_common_condition: Option<String>,
    pub condition_distribution: ConditionDistribution,
    pub total_entries: u32,
    pub entries_with_ai_analysis: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUsageStat {
    pub name: String,
    pub uses: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub skin_condition: Option<String>,
    pub has_analysis: bool,
    pub product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub time_period: TimeWindow,
    pub consistency: ConsistencySummary,
    pub skin_trends: SkinTrendSummary,
    pub product_usage: Vec<ProductUsageStat>,
    pub entries_over_time: Vec<TimelinePoint>,
}

/// Products shown in the overview.
pub const TOP_PRODUCTS: usize = 10;

/// Dashboard overview. `entries` may include dates outside the window; they
/// are ignored. `streak` is computed separately over the full history.
pub fn overview(
    window: &TimeWindow,
    entries: &[EntrySnapshot],
    streak: u32,
) -> Result<Overview, PipelineError> {
    let mut in_window: Vec<&EntrySnapshot> =
        entries.iter().filter(|e| window.contains(e.date)).collect();
    in_window.sort_by_key(|e| e.date);

    let completed_days = in_window.len() as u32;
    let consistency = ConsistencySummary {
        percentage: consistency_percentage(in_window.len(), window.days)?,
        streak,
        total_days: window.days,
        completed_days,
        missed_days: window.days.saturating_sub(completed_days),
    };

    let mut distribution = ConditionDistribution::default();
    for condition in in_window
        .iter()
        .filter_map(|e| e.skin_condition.as_deref())
        .filter(|c| !c.is_empty())
    {
        distribution.record(condition);
    }

    let skin_trends = SkinTrendSummary {
        most_common_condition: distribution.most_common().map(str::to_string),
        condition_distribution: distribution,
        total_entries: completed_days,
        entries_with_ai_analysis: in_window.iter().filter(|e| e.has_analysis_text()).count()
            as u32,
    };

    let mut usage: Vec<(String, u32)> = Vec::new();
    for product in in_window.iter().flat_map(|e| e.products.iter()) {
        match usage.iter_mut().find(|(name, _)| name == product) {
            Some((_, count)) => *count += 1,
            None => usage.push((product.clone(), 1)),
        }
    }
    usage.sort_by(|a, b| b.1.cmp(&a.1));

    let product_usage = usage
        .into_iter()
        .take(TOP_PRODUCTS)
        .map(|(name, uses)| ProductUsageStat {
            percentage: if completed_days > 0 {
                (f64::from(uses) / f64::from(completed_days) * 100.0).round_ties_even() as u32
            } else {
                0
            },
            name,
            uses,
        })
        .collect();

    let entries_over_time = in_window
        .iter()
        .map(|e| TimelinePoint {
            date: e.date,
            skin_condition: e.skin_condition.clone(),
            has_analysis: e.analysis_result.is_some(),
            product_count: e.products.len(),
        })
        .collect();

    Ok(Overview {
        time_period: *window,
        consistency,
        skin_trends,
        product_usage,
        entries_over_time,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinProgress {
    pub time_period: TimeWindow,
    pub metrics: BTreeMap<&'static str, TrendMetric>,
    pub total_analyses: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Concern trends over the analyzed entries inside the window.
pub fn skin_progress(window: &TimeWindow, entries: &[EntrySnapshot]) -> SkinProgress {
    let analyzed: Vec<EntrySnapshot> = entries
        .iter()
        .filter(|e| window.contains(e.date) && e.analysis_result.is_some())
        .cloned()
        .collect();

    let message = analyzed
        .is_empty()
        .then(|| "No AI analysis data available for this period".to_string());

    SkinProgress {
        time_period: *window,
        metrics: concern_trends(&analyzed),
        total_analyses: analyzed.len() as u32,
        message,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEffectivenessReport {
    pub time_period: TimeWindow,
    pub products: Vec<ProductEffectiveness>,
}

pub fn product_effectiveness_report(
    window: &TimeWindow,
    entries: &[EntrySnapshot],
) -> ProductEffectivenessReport {
    let in_window: Vec<EntrySnapshot> = entries
        .iter()
        .filter(|e| window.contains(e.date))
        .cloned()
        .collect();
    ProductEffectivenessReport {
        time_period: *window,
        products: product_effectiveness(&in_window),
    }
}

/// Label with the highest count; the earliest one wins a tie.
fn first_most_frequent(counts: &[(String, u32)]) -> Option<&str> {
    let mut best: Option<&(String, u32)> = None;
    for item in counts {
        if best.map_or(true, |b| item.1 > b.1) {
            best = Some(item);
        }
    }
    best.map(|(label, _)| label.as_str())
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn days_before(today: NaiveDate, n: u64) -> NaiveDate {
        today.checked_sub_days(Days::new(n)).expect("in range")
    }

    #[test]
    fn test_streak_ending_today() {
        let today = day(2024, 3, 10);
        let dates = (0..5).map(|n| days_before(today, n));
        assert_eq!(calculate_streak(dates, today), 5);
    }

    #[test]
    fn test_streak_starts_yesterday_without_today() {
        let today = day(2024, 3, 10);
        let dates = (1..4).map(|n| days_before(today, n));
        assert_eq!(calculate_streak(dates, today), 3);
    }

    #[test]
    fn test_streak_zero_when_today_and_yesterday_missing() {
        let today = day(2024, 3, 10);
        let dates = [days_before(today, 2), days_before(today, 3)];
        assert_eq!(calculate_streak(dates, today), 0);
        assert_eq!(calculate_streak(Vec::new(), today), 0);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let today = day(2024, 1, 2);
        let dates = [today, day(2024, 1, 1), day(2023, 12, 30)];
        assert_eq!(calculate_streak(dates, today), 2);
    }

    #[test]
    fn test_consistency() {
        assert_eq!(consistency_percentage(15, 30), Ok(50));
        assert_eq!(consistency_percentage(0, 7), Ok(0));
        assert_eq!(consistency_percentage(1, 8), Ok(12));
        assert!(matches!(
            consistency_percentage(3, 0),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_window_bounds() {
        let window = TimeWindow::ending_on(day(2024, 3, 31), 30).expect("valid window");
        assert_eq!(window.start_date, day(2024, 3, 1));
        assert!(window.contains(day(2024, 3, 1)));
        assert!(window.contains(day(2024, 3, 31)));
        assert!(!window.contains(day(2024, 2, 29)));
        assert!(TimeWindow::ending_on(day(2024, 3, 31), 0).is_err());
    }

    #[test]
    fn test_trend_worsening_then_improving() {
        let clear = "No major concerns detected";
        let acne = "Skin Type: Oily | Detected: Acne";

        let worsening = [
            EntrySnapshot::new(day(2024, 1, 1)).with_analysis(clear),
            EntrySnapshot::new(day(2024, 1, 2)).with_analysis(clear),
            EntrySnapshot::new(day(2024, 1, 3)).with_analysis(acne),
            EntrySnapshot::new(day(2024, 1, 4)).with_analysis(acne),
        ];
        let metric = concern_trends(&worsening)["acne"];
        assert_eq!(metric.trend, Trend::Worsening);
        assert_eq!(metric.current, 0);
        assert_eq!(metric.change, -10000);

        let improving = [
            EntrySnapshot::new(day(2024, 1, 1)).with_analysis(acne),
            EntrySnapshot::new(day(2024, 1, 2)).with_analysis(acne),
            EntrySnapshot::new(day(2024, 1, 3)).with_analysis(clear),
            EntrySnapshot::new(day(2024, 1, 4)).with_analysis(clear),
        ];
        let metric = concern_trends(&improving)["acne"];
        assert_eq!(metric.trend, Trend::Improving);
        assert_eq!(metric.current, 100);
        assert_eq!(metric.change, 100);
    }

    #[test]
    fn test_trend_orders_by_date_and_reports_all_concerns() {
        let entries = [
            EntrySnapshot::new(day(2024, 1, 3)).with_analysis("visible PORES on forehead"),
            EntrySnapshot::new(day(2024, 1, 1)).with_analysis("dark circles under eye"),
            EntrySnapshot::new(day(2024, 1, 2)),
        ];
        let metrics = concern_trends(&entries);
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics["pores"].trend, Trend::Worsening);
        assert_eq!(metrics["dark_circles"].trend, Trend::Improving);
        assert_eq!(metrics["spots"].trend, Trend::Stable);
        assert_eq!(metrics["spots"].current, 100);
    }

    #[test]
    fn test_trend_needs_two_analyzed_entries() {
        let entries = [
            EntrySnapshot::new(day(2024, 1, 1)).with_analysis("acne"),
            EntrySnapshot::new(day(2024, 1, 2)),
        ];
        assert!(concern_trends(&entries).is_empty());
    }

    #[test]
    fn test_condition_scores() {
        assert_eq!(condition_score("Clear"), 100);
        assert_eq!(condition_score("Oily"), 60);
        assert_eq!(condition_score("Acne"), 30);
        assert_eq!(condition_score("clear"), 50);
    }

    #[test]
    fn test_product_effectiveness() {
        let entries = [
            EntrySnapshot::new(day(2024, 1, 1))
                .with_condition("Acne")
                .with_products(&["Cleanser", "Retinol"]),
            EntrySnapshot::new(day(2024, 1, 2))
                .with_condition("Clear")
                .with_products(&["Cleanser", "Sunscreen"]),
            EntrySnapshot::new(day(2024, 1, 3))
                .with_condition("Normal")
                .with_products(&["Retinol"]),
            EntrySnapshot::new(day(2024, 1, 4)).with_products(&["Retinol"]),
        ];

        let results = product_effectiveness(&entries);
        let names: Vec<&str> = results.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["Sunscreen", "Cleanser", "Retinol"]);

        assert_eq!(results[1].uses, 2);
        assert_eq!(results[1].average_skin_score, 65.0);
        assert_eq!(results[1].most_common_condition, "Acne");
        assert_eq!(results[2].uses, 2);
        assert_eq!(results[2].average_skin_score, 60.0);
    }

    #[test]
    fn test_product_effectiveness_ties_keep_encounter_order() {
        let entries = [EntrySnapshot::new(day(2024, 1, 1))
            .with_condition("Dry")
            .with_products(&["B Serum", "A Toner"])];
        let names: Vec<String> = product_effectiveness(&entries)
            .into_iter()
            .map(|r| r.product_name)
            .collect();
        assert_eq!(names, vec!["B Serum", "A Toner"]);
    }

    #[test]
    fn test_overview() {
        let today = day(2024, 3, 31);
        let window = TimeWindow::ending_on(today, 30).expect("valid window");
        let entries = vec![
            EntrySnapshot::new(day(2024, 2, 1)).with_condition("Acne"),
            EntrySnapshot::new(day(2024, 3, 30))
                .with_condition("Dry")
                .with_products(&["Serum", "Cream"]),
            EntrySnapshot::new(day(2024, 3, 31))
                .with_condition("Clear")
                .with_analysis("No major concerns detected")
                .with_products(&["Cream"]),
            EntrySnapshot::new(day(2024, 3, 2)).with_condition("Dry"),
        ];

        let result = overview(&window, &entries, 2).expect("valid window");
        assert_eq!(result.consistency.completed_days, 3);
        assert_eq!(result.consistency.percentage, 10);
        assert_eq!(result.consistency.missed_days, 27);
        assert_eq!(result.consistency.streak, 2);
        assert_eq!(result.skin_trends.most_common_condition.as_deref(), Some("Dry"));
        assert_eq!(result.skin_trends.condition_distribution.get("Dry"), Some(2));
        assert_eq!(result.skin_trends.entries_with_ai_analysis, 1);
        assert_eq!(result.product_usage[0].name, "Cream");
        assert_eq!(result.product_usage[0].percentage, 67);
        assert_eq!(result.product_usage[1].percentage, 33);
        let dates: Vec<NaiveDate> = result.entries_over_time.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2024, 3, 2), day(2024, 3, 30), day(2024, 3, 31)]);
    }

    #[test]
    fn test_condition_distribution_keeps_first_seen_order() {
        let window = TimeWindow::ending_on(day(2024, 3, 31), 7).expect("valid window");
        let entries = vec![
            EntrySnapshot::new(day(2024, 3, 27)).with_condition("Oily"),
            EntrySnapshot::new(day(2024, 3, 28)).with_condition("Acne"),
            EntrySnapshot::new(day(2024, 3, 29)).with_condition("Dry"),
            EntrySnapshot::new(day(2024, 3, 30)).with_condition("Acne"),
        ];

        let result = overview(&window, &entries, 0).expect("valid window");
        let distribution = &result.skin_trends.condition_distribution;
        let order: Vec<&str> = distribution.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!["Oily", "Acne", "Dry"]);
        assert_eq!(
            serde_json::to_string(distribution).expect("serializable"),
            r#"{"Oily":1,"Acne":2,"Dry":1}"#
        );
        assert_eq!(result.skin_trends.most_common_condition.as_deref(), Some("Acne"));
    }

    #[test]
    fn test_empty_analysis_is_not_counted() {
        let window = TimeWindow::ending_on(day(2024, 3, 31), 7).expect("valid window");
        let entries = vec![
            EntrySnapshot::new(day(2024, 3, 29)).with_analysis(""),
            EntrySnapshot::new(day(2024, 3, 30)).with_analysis("Detected: Acne"),
            EntrySnapshot::new(day(2024, 3, 31)),
        ];

        let result = overview(&window, &entries, 0).expect("valid window");
        assert_eq!(result.skin_trends.entries_with_ai_analysis, 1);
        assert!(!entries[0].has_analysis_text());
        assert!(entries[1].has_analysis_text());
    }

    #[test]
    fn test_skin_progress_without_analyses() {
        let window = TimeWindow::ending_on(day(2024, 3, 31), 7).expect("valid window");
        let progress = skin_progress(&window, &[EntrySnapshot::new(day(2024, 3, 30))]);
        assert!(progress.metrics.is_empty());
        assert_eq!(progress.total_analyses, 0);
        assert!(progress.message.is_some());
    }
}
