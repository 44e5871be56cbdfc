// src/services/period_filter.rs

use async_trait::async_trait;
use chrono::Datelike;

use crate::{
    common::error::AppError,
    models::collection::CollectionCase,
    services::days_overdue::parse_due_date,
};

/// Filtro de pagamentos por período. Devolve o subconjunto que pertence ao período.
#[async_trait]
pub trait PeriodFilter: Send + Sync {
    async fn filter_by_period(
        &self,
        cases: &[CollectionCase],
        period: &str,
    ) -> Result<Vec<CollectionCase>, AppError>;
}

/// Período no formato `YYYY-MM`. Um pagamento pertence ao mês da sua
/// data de pagamento; sem data legível, vale o mês de cobrança do caso.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentMonthFilter;

impl PaymentMonthFilter {
    fn belongs(case: &CollectionCase, year: i32, month: u32, period: &str) -> bool {
        match case.payment_date.as_deref().and_then(parse_due_date) {
            Some(paid_at) => paid_at.year() == year && paid_at.month() == month,
            None => case.month.trim() == period,
        }
    }
}

pub fn parse_period(period: &str) -> Option<(i32, u32)> {
    let (year, month) = period.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

#[async_trait]
impl PeriodFilter for PaymentMonthFilter {
    async fn filter_by_period(
        &self,
        cases: &[CollectionCase],
        period: &str,
    ) -> Result<Vec<CollectionCase>, AppError> {
        let (year, month) = parse_period(period)
            .ok_or_else(|| AppError::InvalidPeriod(period.to_string()))?;

        Ok(cases
            .iter()
            .filter(|case| case.stage.is_terminal())
            .filter(|case| Self::belongs(case, year, month, period.trim()))
            .cloned()
            .collect())
    }
}
