// src/services/board_metrics.rs

use crate::models::{board::BoardMetrics, collection::CollectionCase};

/// Indicadores por faixa de atraso. Casos pagos contam só em `payment_made`.
pub fn compute_metrics<'a, I>(cases: I) -> BoardMetrics
where
    I: IntoIterator<Item = &'a CollectionCase>,
{
    let mut metrics = BoardMetrics::default();

    for case in cases {
        metrics.total += 1;

        if case.stage.is_terminal() {
            metrics.payment_made += 1;
            continue;
        }

        match case.days_overdue {
            d if d <= 5 => metrics.up_to_5_days += 1,
            d if d <= 10 => metrics.up_to_10_days += 1,
            _ => metrics.over_10_days += 1,
        }
    }

    metrics
}
