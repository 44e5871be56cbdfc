// src/services/stage_index.rs

use std::collections::{BTreeMap, HashSet};

use crate::models::{
    board::StageColumn,
    collection::{CollectionCase, Stage},
};

/// Estado do filtro de período (mês) aplicado à coluna de pagamentos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeriodSelection {
    #[default]
    Inactive,
    // O filtro manda: ids vazios = coluna vazia
    Active { period: String, ids: HashSet<String> },
}

impl PeriodSelection {
    pub fn period(&self) -> Option<&str> {
        match self {
            PeriodSelection::Inactive => None,
            PeriodSelection::Active { period, .. } => Some(period),
        }
    }

    fn admits(&self, case: &CollectionCase) -> bool {
        match self {
            PeriodSelection::Inactive => true,
            PeriodSelection::Active { ids, .. } => ids.contains(&case.id),
        }
    }
}

/// Casos agrupados por etapa, na ordem do conjunto de trabalho.
#[derive(Debug, Clone)]
pub struct StageGroups {
    groups: BTreeMap<Stage, Vec<CollectionCase>>,
}

impl StageGroups {
    pub fn cases(&self, stage: Stage) -> &[CollectionCase] {
        self.groups.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.cases(stage).len()
    }

    pub fn shown(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Monta as colunas na ordem do funil, com o título que o chamador der.
    pub fn into_columns(mut self, title: impl Fn(Stage) -> String) -> Vec<StageColumn> {
        Stage::ALL
            .iter()
            .map(|stage| {
                let cases = self.groups.remove(stage).unwrap_or_default();
                StageColumn {
                    stage: *stage,
                    title: title(*stage),
                    count: cases.len(),
                    cases,
                }
            })
            .collect()
    }
}

/// Separa o conjunto de trabalho nas quatro etapas. Só a etapa final passa
/// pelo filtro de período: apenas pagamentos são atribuídos a um mês.
pub fn group_by_stage<'a, I>(cases: I, selection: &PeriodSelection) -> StageGroups
where
    I: IntoIterator<Item = &'a CollectionCase>,
{
    let mut groups: BTreeMap<Stage, Vec<CollectionCase>> =
        Stage::ALL.iter().map(|s| (*s, Vec::new())).collect();

    for case in cases {
        if case.stage.is_terminal() && !selection.admits(case) {
            continue;
        }
        groups.entry(case.stage).or_default().push(case.clone());
    }

    StageGroups { groups }
}
