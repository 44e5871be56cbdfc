// src/services/in_flight.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Conjunto de casos com operação em andamento. A trava é por id:
/// casos diferentes nunca esperam um pelo outro.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` se já existe operação para o mesmo id.
    pub fn try_acquire(&self, id: &str) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            ids: Arc::clone(&self.ids),
            id: id.to_string(),
        })
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }
}

/// Libera o id ao sair de escopo: sucesso, recusa, erro ou cancelamento.
#[derive(Debug)]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_id_is_rejected() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_acquire("1");
        assert!(guard.is_some());
        assert!(in_flight.try_acquire("1").is_none());
        // Outro caso segue livre
        assert!(in_flight.try_acquire("2").is_some());

        drop(guard);
        assert!(!in_flight.is_busy("1"));
        assert!(in_flight.try_acquire("1").is_some());
    }
}
