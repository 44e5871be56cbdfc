// src/services/days_overdue.rs

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::collection::CollectionCase;

/// Lê um vencimento `DD/MM/YYYY`. Qualquer coisa fora disso vira `None`.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;

    // from_ymd_opt já recusa 31/02, 00/01 etc.
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Dias de atraso de um caso em `today`.
///
/// Casos pagos ficam congelados no último valor calculado; sem vencimento
/// ou com vencimento ilegível, o valor guardado é mantido.
pub fn days_overdue(case: &CollectionCase, today: NaiveDate) -> i64 {
    if case.stage.is_terminal() {
        return case.days_overdue;
    }

    let Some(raw) = case.due_date.as_deref().filter(|d| !d.trim().is_empty()) else {
        return case.days_overdue;
    };

    match parse_due_date(raw) {
        Some(due) => days_between(due, today),
        None => {
            tracing::debug!("Vencimento ilegível '{}' no caso {}", raw, case.id);
            case.days_overdue
        }
    }
}

// Datas sem hora: a diferença já é em dias inteiros (o "teto" é exato).
fn days_between(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days().max(0)
}

/// Memoiza o cálculo por dia do calendário. O valor não muda dentro do
/// mesmo dia, então o cache só é descartado quando a data vira.
#[derive(Debug, Default)]
pub struct DaysOverdueCalculator {
    day: Option<NaiveDate>,
    // vencimento (texto) -> dias, ou None se ilegível
    memo: HashMap<String, Option<i64>>,
}

impl DaysOverdueCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(&mut self, case: &CollectionCase, today: NaiveDate) -> i64 {
        if self.day != Some(today) {
            self.memo.clear();
            self.day = Some(today);
        }

        if case.stage.is_terminal() {
            return case.days_overdue;
        }

        let Some(raw) = case.due_date.as_deref().filter(|d| !d.trim().is_empty()) else {
            return case.days_overdue;
        };

        let cached = self
            .memo
            .entry(raw.to_string())
            .or_insert_with(|| parse_due_date(raw).map(|due| days_between(due, today)));

        cached.unwrap_or(case.days_overdue)
    }

    /// Devolve o caso com `days_overdue` atualizado.
    pub fn refresh(&mut self, mut case: CollectionCase, today: NaiveDate) -> CollectionCase {
        case.days_overdue = self.compute(&case, today);
        case
    }

    pub fn cached_entries(&self) -> usize {
        self.memo.len()
    }
}
